//! # hourgate
//!
//! **Access policy engine for HTTP forward proxies.**
//!
//! hourgate decides, for every outbound request a proxy sees, whether to let
//! it through. Policy comes from three plain files that can be edited while
//! the process runs:
//!
//! - a **whitelist**: a host must match it to be allowed (default-deny)
//! - a **blacklist**: a matching host is denied even when whitelisted
//! - **time-window rules**: `host,minHour,maxHour` rows restricting hours
//!
//! ## Architecture
//!
//! - **[`policy`]** — snapshot, loader, atomically swapped store, reload
//!   scheduler, decision engine and admin access
//! - **[`proxy`]** — the per-request filter the transport calls
//! - **[`web`]** — JSON admin API (axum)
//! - **[`logging`]** — tracing setup and audit records
//! - **[`cli`]** — command-line interface (clap)
//! - **[`error`]** — unified error types using `thiserror`
//!
//! ## Quick Start
//!
//! ```bash
//! echo "example.com" > whitelist.txt
//! echo "ads.example.com" > blacklist.txt
//! echo "games.com,22,6" > rules.txt
//!
//! hourgate check sub.example.com --hour 10
//! hourgate start
//! ```

pub mod cli;
pub mod error;
pub mod logging;
pub mod policy;
pub mod proxy;
pub mod web;
