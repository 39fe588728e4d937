use tracing::debug;

use super::snapshot::PolicySnapshot;
use crate::logging;

/// Outcome of evaluating one request against a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// A time-window rule for this destination fired.
    DenyTimeWindow,
    /// Blacklisted, or not whitelisted.
    DenyListPolicy,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Plain-text body for the 403 response the transport sends on denial.
    pub fn denial_message(&self) -> Option<&'static str> {
        match self {
            Decision::Allow => None,
            Decision::DenyTimeWindow => Some("Your exceed your time window on this site"),
            Decision::DenyListPolicy => Some("This site is not accessible to you"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::DenyTimeWindow => "deny-time-window",
            Decision::DenyListPolicy => "deny-list-policy",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evaluate a request against a snapshot.
///
/// Time-window rules are checked first; the first matching rule whose window
/// forbids `hour` denies. Otherwise the list check applies: the host must
/// match the whitelist and must not match the blacklist. Blacklist wins over
/// whitelist.
pub fn decide(snapshot: &PolicySnapshot, host: &str, hour: i32) -> Decision {
    if time_window_denies(snapshot, host, hour) {
        return Decision::DenyTimeWindow;
    }
    list_decision(snapshot, host)
}

fn time_window_denies(snapshot: &PolicySnapshot, host: &str, hour: i32) -> bool {
    snapshot
        .rules()
        .iter()
        .filter(|rule| rule.applies_to(host))
        .any(|rule| rule.forbids(hour))
}

fn list_decision(snapshot: &PolicySnapshot, host: &str) -> Decision {
    let whitelisted = snapshot.whitelist().matches(host);
    let blacklisted = snapshot.blacklist().matches(host);
    if blacklisted || !whitelisted {
        Decision::DenyListPolicy
    } else {
        Decision::Allow
    }
}

/// Decision engine with audit logging.
///
/// Holds no policy of its own; each call works on the snapshot it is handed,
/// which the caller fetched from the store for this one decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionEngine {
    verbose: u8,
}

impl DecisionEngine {
    pub fn new(verbose: u8) -> Self {
        Self { verbose }
    }

    pub fn decide(&self, snapshot: &PolicySnapshot, host: &str, path: &str, hour: i32) -> Decision {
        let decision = decide(snapshot, host, hour);
        if self.verbose > 0 {
            logging::audit(host, path, decision);
        } else {
            match decision {
                Decision::Allow => {}
                Decision::DenyTimeWindow => {
                    debug!("BLOCKED {} at hour {} - time window", host, hour)
                }
                Decision::DenyListPolicy => debug!("BLOCKED {} - list policy", host),
            }
        }
        decision
    }
}
