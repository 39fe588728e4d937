//! Immutable policy snapshot.
//!
//! A [`PolicySnapshot`] is built once by the loader, compiled up front, and
//! never mutated afterwards. Replacing policy always means building a new
//! snapshot and swapping it into the [`PolicyStore`](super::store::PolicyStore).

use std::time::Instant;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::error::HourgateError;

/// Separator used to join list entries into one disjunctive pattern.
const LIST_SEPARATOR: &str = "$|";

/// A whitelist or blacklist: the raw entries plus their compiled matcher.
///
/// Entries are joined with `$|`, so every entry except the last is
/// end-anchored and the last one is an unanchored search. Entries are regex
/// fragments, meaning a `.` in a hostname matches any character.
#[derive(Debug, Clone)]
pub struct HostList {
    entries: Vec<String>,
    matcher: Option<Regex>,
}

impl HostList {
    pub fn new(entries: Vec<String>) -> Self {
        let matcher = if entries.is_empty() {
            None
        } else {
            compile(&entries.join(LIST_SEPARATOR))
        };
        Self { entries, matcher }
    }

    /// Whether `host` matches any entry. An empty or uncompilable list never matches.
    pub fn matches(&self, host: &str) -> bool {
        self.matcher
            .as_ref()
            .is_some_and(|re| re.is_match(host))
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newline-delimited text, the same shape the list files use.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(entry);
            out.push('\n');
        }
        out
    }
}

impl PartialEq for HostList {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

/// A per-destination hour-of-day rule.
///
/// The rule fires when `hour < min_hour && hour > max_hour`, which can only
/// happen when `min_hour > max_hour`.
#[derive(Debug, Clone, Serialize)]
pub struct TimeRule {
    pub host: String,
    pub min_hour: i32,
    pub max_hour: i32,
    #[serde(skip)]
    matcher: Option<Regex>,
}

impl TimeRule {
    pub fn new(host: impl Into<String>, min_hour: i32, max_hour: i32) -> Self {
        let host = host.into();
        let matcher = compile(&format!("{}$", host));
        Self {
            host,
            min_hour,
            max_hour,
            matcher,
        }
    }

    /// Whether the rule applies to `host` (end-anchored match on the pattern).
    pub fn applies_to(&self, host: &str) -> bool {
        self.matcher
            .as_ref()
            .is_some_and(|re| re.is_match(host))
    }

    /// Whether `hour` falls in the forbidden window.
    pub fn forbids(&self, hour: i32) -> bool {
        hour < self.min_hour && hour > self.max_hour
    }
}

impl PartialEq for TimeRule {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host
            && self.min_hour == other.min_hour
            && self.max_hour == other.max_hour
    }
}

/// One internally consistent copy of all policy state.
#[derive(Debug, Clone)]
pub struct PolicySnapshot {
    whitelist: HostList,
    blacklist: HostList,
    rules: Vec<TimeRule>,
    loaded_at: Instant,
    loaded_wall: DateTime<Utc>,
}

impl PolicySnapshot {
    pub fn new(whitelist: Vec<String>, blacklist: Vec<String>, rules: Vec<TimeRule>) -> Self {
        Self {
            whitelist: HostList::new(whitelist),
            blacklist: HostList::new(blacklist),
            rules,
            loaded_at: Instant::now(),
            loaded_wall: Utc::now(),
        }
    }

    /// A snapshot with no entries at all. Under default-deny it denies every host.
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new())
    }

    pub fn whitelist(&self) -> &HostList {
        &self.whitelist
    }

    pub fn blacklist(&self) -> &HostList {
        &self.blacklist
    }

    pub fn rules(&self) -> &[TimeRule] {
        &self.rules
    }

    /// Monotonic time at which this snapshot was built.
    pub fn loaded_at(&self) -> Instant {
        self.loaded_at
    }

    /// Wall-clock time at which this snapshot was built, for display.
    pub fn loaded_wall(&self) -> DateTime<Utc> {
        self.loaded_wall
    }

    /// Rules as `host,minHour,maxHour` rows.
    pub fn rules_text(&self) -> String {
        let mut out = String::new();
        for rule in &self.rules {
            out.push_str(&format!("{},{},{}\n", rule.host, rule.min_hour, rule.max_hour));
        }
        out
    }

    /// True when both snapshots carry the same lists and rules, ignoring load time.
    pub fn same_policy(&self, other: &PolicySnapshot) -> bool {
        self.whitelist == other.whitelist
            && self.blacklist == other.blacklist
            && self.rules == other.rules
    }
}

/// Compile a pattern, reporting failures as a warning and falling back to "no match".
fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(source) => {
            let err = HourgateError::Match {
                pattern: pattern.to_string(),
                source,
            };
            warn!("{} (treated as no match)", err);
            None
        }
    }
}
