//! Periodic and explicit policy reload.
//!
//! The [`ReloadScheduler`] owns the "last reload" timestamp and is the only
//! thing that installs snapshots into the [`PolicyStore`]. Every reload runs
//! under one mutex:
//!
//! - [`ReloadScheduler::maybe_reload`] and [`ReloadScheduler::scheduled_reload`]
//!   use `try_lock`, so when a reload is already running the caller returns
//!   immediately instead of piling up a second one.
//! - [`ReloadScheduler::reload_now`] and [`ReloadScheduler::install_with`]
//!   wait for the lock, so explicit reloads queue behind a running one.
//!
//! A failed reload keeps the old snapshot and is logged; the failure still
//! stamps the reload time so a broken file is retried once per interval.
//!
//! Reload triggers:
//!
//! - **Interval**: [`spawn_reload_loop`] reloads on every tick of the
//!   configured interval.
//! - **Request path**: [`ReloadScheduler::maybe_reload`] reloads once the
//!   installed snapshot is older than the interval.
//! - **SIGHUP** (Unix only): [`start_sighup_handler`] reloads on
//!   `kill -HUP <pid>`, bypassing the interval.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::config::{PolicySources, ReloadInterval};
use super::loader;
use super::snapshot::PolicySnapshot;
use super::store::PolicyStore;
use crate::error::Result;

/// What a call to [`ReloadScheduler::maybe_reload`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Periodic reload is switched off.
    Disabled,
    /// The installed snapshot is within the interval.
    Fresh,
    /// Another caller is reloading right now.
    InFlight,
    Reloaded,
    /// Loading failed; the previous snapshot is still installed.
    Failed,
}

pub struct ReloadScheduler {
    store: Arc<PolicyStore>,
    sources: PolicySources,
    interval: ReloadInterval,
    last_reload: Mutex<Instant>,
    reloads: AtomicU64,
}

impl ReloadScheduler {
    /// The store is assumed freshly loaded, so the interval starts now.
    pub fn new(store: Arc<PolicyStore>, sources: PolicySources, interval: ReloadInterval) -> Self {
        Self {
            store,
            sources,
            interval,
            last_reload: Mutex::new(Instant::now()),
            reloads: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<PolicyStore> {
        &self.store
    }

    pub fn sources(&self) -> &PolicySources {
        &self.sources
    }

    pub fn interval(&self) -> ReloadInterval {
        self.interval
    }

    /// Number of reload attempts that read the policy files, successful or not.
    pub fn reload_count(&self) -> u64 {
        self.reloads.load(Ordering::Relaxed)
    }

    /// Reload if more than one interval has passed since the last reload.
    ///
    /// Never waits: if another reload holds the lock this returns
    /// [`ReloadOutcome::InFlight`] straight away.
    pub fn maybe_reload(&self, now: Instant) -> ReloadOutcome {
        let Some(period) = self.interval.period() else {
            return ReloadOutcome::Disabled;
        };

        let Some(mut last) = self.try_lock() else {
            return ReloadOutcome::InFlight;
        };

        if now.saturating_duration_since(*last) <= period {
            return ReloadOutcome::Fresh;
        }

        let outcome = self.attempt_reload();
        *last = now;
        outcome
    }

    /// Reload for a timer tick: no staleness check, since the tick itself
    /// marks the interval.
    ///
    /// Like [`maybe_reload`](Self::maybe_reload) it never waits behind a
    /// running reload.
    pub fn scheduled_reload(&self) -> ReloadOutcome {
        if self.interval.period().is_none() {
            return ReloadOutcome::Disabled;
        }
        let Some(mut last) = self.try_lock() else {
            return ReloadOutcome::InFlight;
        };
        let outcome = self.attempt_reload();
        *last = Instant::now();
        outcome
    }

    /// Reload from disk now, ignoring the interval.
    ///
    /// On failure the old snapshot stays installed and the error is returned.
    pub fn reload_now(&self) -> Result<()> {
        self.install_with(loader::load).map(|_| ())
    }

    /// Run `produce` under the reload lock and install what it returns.
    ///
    /// This is how out-of-band writers (the admin API) replace policy without
    /// racing a scheduled reload.
    pub fn install_with<F>(&self, produce: F) -> Result<Arc<PolicySnapshot>>
    where
        F: FnOnce(&PolicySources) -> Result<PolicySnapshot>,
    {
        let mut last = self.lock_blocking();
        self.reloads.fetch_add(1, Ordering::Relaxed);
        let snapshot = produce(&self.sources)?;
        self.store.install(snapshot);
        *last = Instant::now();
        let current = self.store.current();
        info!(
            "Policy installed ({} whitelist, {} blacklist, {} rules)",
            current.whitelist().entries().len(),
            current.blacklist().entries().len(),
            current.rules().len()
        );
        Ok(current)
    }

    fn attempt_reload(&self) -> ReloadOutcome {
        match self.load_and_install() {
            Ok(()) => ReloadOutcome::Reloaded,
            Err(e) => {
                warn!("Policy reload failed (keeping old policy): {}", e);
                ReloadOutcome::Failed
            }
        }
    }

    fn load_and_install(&self) -> Result<()> {
        self.reloads.fetch_add(1, Ordering::Relaxed);
        let snapshot = loader::load(&self.sources)?;
        info!(
            "Policy reloaded from {}, {}, {} ({} whitelist, {} blacklist, {} rules)",
            self.sources.whitelist.display(),
            self.sources.blacklist.display(),
            self.sources.rules.display(),
            snapshot.whitelist().entries().len(),
            snapshot.blacklist().entries().len(),
            snapshot.rules().len()
        );
        self.store.install(snapshot);
        Ok(())
    }

    fn try_lock(&self) -> Option<MutexGuard<'_, Instant>> {
        match self.last_reload.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::WouldBlock) => None,
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
        }
    }

    fn lock_blocking(&self) -> MutexGuard<'_, Instant> {
        self.last_reload
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Spawn the periodic reload loop. Returns `None` when reload is disabled.
///
/// File reads run on the blocking pool so the runtime's workers stay free.
pub fn spawn_reload_loop(scheduler: Arc<ReloadScheduler>) -> Option<JoinHandle<()>> {
    let period = scheduler.interval().period()?;
    info!("Reloading policy every {}s", period.as_secs());
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let s = scheduler.clone();
            if let Err(e) = tokio::task::spawn_blocking(move || s.scheduled_reload()).await {
                warn!("Reload task panicked: {}", e);
            }
        }
    }))
}

/// Start a SIGHUP handler that reloads the policy on signal.
#[cfg(unix)]
pub fn start_sighup_handler(scheduler: Arc<ReloadScheduler>) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sig = signal(SignalKind::hangup())?;
    tokio::spawn(async move {
        loop {
            if sig.recv().await.is_none() {
                break;
            }
            info!("SIGHUP received, reloading policy...");
            let s = scheduler.clone();
            match tokio::task::spawn_blocking(move || s.reload_now()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Policy reload on SIGHUP failed (keeping old policy): {}", e),
                Err(e) => warn!("Reload task panicked: {}", e),
            }
        }
    });
    Ok(())
}

/// No-op SIGHUP handler for non-Unix platforms.
#[cfg(not(unix))]
pub fn start_sighup_handler(_scheduler: Arc<ReloadScheduler>) -> std::io::Result<()> {
    Ok(())
}
