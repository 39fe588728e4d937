//! The seam the proxy transport calls once per outbound request.
//!
//! Connection handling, TLS and HTTP parsing belong to the transport. It
//! hands [`PolicyFilter::on_request`] the destination host and request path
//! and gets back either [`FilterOutcome::Forward`] or a 403 to send instead.

use std::sync::Arc;
use std::time::Instant;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Timelike;

use crate::policy::reload::ReloadScheduler;
use crate::policy::{Decision, DecisionEngine, PolicyStore};

/// What the transport should do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Forward the request unmodified.
    Forward,
    /// Answer with this response instead of forwarding.
    Respond(BlockResponse),
}

/// A plain-text 403 explaining the denial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockResponse {
    pub status: StatusCode,
    pub body: &'static str,
}

impl BlockResponse {
    pub const CONTENT_TYPE: &'static str = "text/plain";

    pub fn for_decision(decision: Decision) -> Option<Self> {
        decision.denial_message().map(|body| BlockResponse {
            status: StatusCode::FORBIDDEN,
            body,
        })
    }
}

impl IntoResponse for BlockResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, Self::CONTENT_TYPE)],
            self.body,
        )
            .into_response()
    }
}

pub struct PolicyFilter {
    store: Arc<PolicyStore>,
    engine: DecisionEngine,
    inline_reload: Option<Arc<ReloadScheduler>>,
}

impl PolicyFilter {
    pub fn new(store: Arc<PolicyStore>, engine: DecisionEngine) -> Self {
        Self {
            store,
            engine,
            inline_reload: None,
        }
    }

    /// Check for a stale policy on the request path as well.
    ///
    /// Only the caller that wins the reload lock reads files; everyone else
    /// proceeds with the installed snapshot.
    pub fn with_inline_reload(mut self, scheduler: Arc<ReloadScheduler>) -> Self {
        self.inline_reload = Some(scheduler);
        self
    }

    /// Decide for `host` at a given hour of day against the current snapshot.
    pub fn decide(&self, host: &str, path: &str, hour: i32) -> Decision {
        let snapshot = self.store.current();
        self.engine.decide(&snapshot, host, path, hour)
    }

    /// Like [`decide`](Self::decide) for a `host` as the transport sees it,
    /// which may carry a port (`example.com:8080`). The port is stripped
    /// before matching.
    pub fn decide_authority(&self, host: &str, path: &str, hour: i32) -> Decision {
        self.decide(strip_port(host), path, hour)
    }

    /// Evaluate a request at the current local hour.
    ///
    /// `host` may carry a port (`example.com:8080`); it is stripped before matching.
    pub fn on_request(&self, host: &str, path: &str) -> FilterOutcome {
        if let Some(scheduler) = &self.inline_reload {
            scheduler.maybe_reload(Instant::now());
        }
        let hour = chrono::Local::now().hour() as i32;
        let decision = self.decide_authority(host, path, hour);
        match BlockResponse::for_decision(decision) {
            Some(response) => FilterOutcome::Respond(response),
            None => FilterOutcome::Forward,
        }
    }
}

/// Drop a trailing `:port` from a host, leaving bracketed IPv6 literals intact.
fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return match rest.find(']') {
            Some(end) => &host[..end + 2],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port))
            if !name.contains(':') && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) =>
        {
            name
        }
        _ => host,
    }
}
