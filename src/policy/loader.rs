//! Reading policy files into a fresh [`PolicySnapshot`].
//!
//! List files hold one host pattern per line; blank lines and lines starting
//! with `#` are skipped. The rules file holds `host,minHour,maxHour` rows.
//! A missing file of either kind is an empty policy source, not an error.
//!
//! Nothing here touches shared state: the loader either returns a complete
//! snapshot or fails.

use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use super::config::PolicySources;
use super::snapshot::{PolicySnapshot, TimeRule};
use crate::error::{HourgateError, PolicyLoadCause, Result};

/// Load all three policy files into a new snapshot.
pub fn load(sources: &PolicySources) -> Result<PolicySnapshot> {
    let whitelist = read_list(&sources.whitelist)?;
    let blacklist = read_list(&sources.blacklist)?;
    let rules = read_rules(&sources.rules)?;
    debug!(
        "Loaded {} whitelist, {} blacklist entries and {} rules",
        whitelist.len(),
        blacklist.len(),
        rules.len()
    );
    Ok(PolicySnapshot::new(whitelist, blacklist, rules))
}

/// Build a snapshot from in-memory texts, attributing rule errors to `sources.rules`.
pub fn from_texts(
    sources: &PolicySources,
    whitelist: &str,
    blacklist: &str,
    rules: &str,
) -> Result<PolicySnapshot> {
    let rules = parse_rules(rules).map_err(|cause| HourgateError::load(&sources.rules, cause))?;
    Ok(PolicySnapshot::new(
        parse_list(whitelist),
        parse_list(blacklist),
        rules,
    ))
}

/// Read a whitelist/blacklist file. A missing file yields an empty list.
pub fn read_list(path: &Path) -> Result<Vec<String>> {
    match read_optional(path)? {
        Some(text) => Ok(parse_list(&text)),
        None => Ok(Vec::new()),
    }
}

/// Read the rules file. A missing file yields no rules.
pub fn read_rules(path: &Path) -> Result<Vec<TimeRule>> {
    match read_optional(path)? {
        Some(text) => parse_rules(&text).map_err(|cause| HourgateError::load(path, cause)),
        None => Ok(Vec::new()),
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{} not found, treating as empty", path.display());
            Ok(None)
        }
        Err(e) => Err(HourgateError::load(path, e)),
    }
}

/// Parse list text: trimmed lines, skipping blanks and `#` comments.
pub fn parse_list(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                None
            } else {
                Some(line.to_string())
            }
        })
        .collect()
}

/// Parse rules text into rules.
///
/// Each non-blank, non-comment row must have exactly three comma-separated
/// fields. Hour fields that are not integers become `0`.
pub fn parse_rules(text: &str) -> std::result::Result<Vec<TimeRule>, PolicyLoadCause> {
    let mut rules = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        if fields.len() != 3 {
            return Err(PolicyLoadCause::MalformedRule {
                line: idx + 1,
                fields: fields.len(),
            });
        }
        rules.push(TimeRule::new(
            fields[0],
            parse_hour(fields[1]),
            parse_hour(fields[2]),
        ));
    }
    Ok(rules)
}

fn parse_hour(field: &str) -> i32 {
    field.parse().unwrap_or(0)
}
