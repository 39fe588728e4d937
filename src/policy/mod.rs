//! Policy engine for hourgate.
//!
//! - [`config`] — TOML configuration
//! - [`snapshot`] — immutable compiled policy state
//! - [`loader`] — list and rules file parsing
//! - [`store`] — the atomically swapped current snapshot
//! - [`reload`] — interval/explicit reload with single-flight guarding
//! - [`engine`] — the per-request allow/deny decision
//! - [`admin`] — read/replace access for the admin API

pub mod admin;
pub mod config;
pub mod engine;
pub mod loader;
pub mod reload;
pub mod snapshot;
pub mod store;

pub use engine::{Decision, DecisionEngine};
pub use snapshot::{PolicySnapshot, TimeRule};
pub use store::PolicyStore;
