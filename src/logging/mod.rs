//! Tracing setup and the per-decision audit record.
//!
//! `RUST_LOG` takes precedence when set. Otherwise the filter follows the
//! configured verbosity: `0` → `info`, `1` → `debug`, `2+` → `trace`.
//! Audit records go to the `hourgate::audit` target at `info` level.

use tracing_subscriber::EnvFilter;

use crate::policy::Decision;

/// Tracing target for per-decision audit records.
pub const AUDIT_TARGET: &str = "hourgate::audit";

/// Filter directive for a verbosity level.
pub fn filter_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Install the global `tracing` subscriber.
pub fn init(verbose: u8) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_for(verbose)));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Record one decision with the host and escaped request path.
pub fn audit(host: &str, path: &str, decision: Decision) {
    tracing::info!(
        target: AUDIT_TARGET,
        host,
        path = %escape_html(path),
        decision = decision.as_str(),
        "{} {} {}",
        decision,
        host,
        escape_html(path)
    );
}

/// Escape the five HTML-special characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&#34;"),
            _ => out.push(c),
        }
    }
    out
}
