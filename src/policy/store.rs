//! The process-wide holder of the active [`PolicySnapshot`].
//!
//! Readers take a cheap `Arc` to whatever snapshot is installed at that
//! moment; writers replace the whole snapshot in a single atomic swap.
//! A reader therefore sees either the old policy or the new one, never a
//! whitelist from one load paired with a blacklist from another.

use std::sync::Arc;

use arc_swap::ArcSwap;

use super::config::PolicySources;
use super::loader;
use super::snapshot::PolicySnapshot;
use crate::error::Result;

#[derive(Debug)]
pub struct PolicyStore {
    current: ArcSwap<PolicySnapshot>,
}

impl PolicyStore {
    pub fn new(snapshot: PolicySnapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
        }
    }

    /// Initial load from disk. Callers treat an error here as fatal.
    pub fn load(sources: &PolicySources) -> Result<Self> {
        Ok(Self::new(loader::load(sources)?))
    }

    /// The snapshot installed right now. Never blocks on a reload.
    pub fn current(&self) -> Arc<PolicySnapshot> {
        self.current.load_full()
    }

    /// Atomically replace the active snapshot, returning the one it replaced.
    pub fn install(&self, snapshot: PolicySnapshot) -> Arc<PolicySnapshot> {
        self.current.swap(Arc::new(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn install_replaces_whole_snapshot() {
        let store = PolicyStore::new(PolicySnapshot::new(
            vec!["old.com".into()],
            vec!["old-ads.com".into()],
            vec![],
        ));
        let previous = store.install(PolicySnapshot::new(
            vec!["new.com".into()],
            vec!["new-ads.com".into()],
            vec![],
        ));

        assert_eq!(previous.whitelist().entries(), ["old.com"]);
        let now = store.current();
        assert_eq!(now.whitelist().entries(), ["new.com"]);
        assert_eq!(now.blacklist().entries(), ["new-ads.com"]);
    }

    #[test]
    fn held_snapshot_outlives_install() {
        let store = PolicyStore::new(PolicySnapshot::new(vec!["a.com".into()], vec![], vec![]));
        let held = store.current();
        store.install(PolicySnapshot::empty());
        assert_eq!(held.whitelist().entries(), ["a.com"]);
        assert!(store.current().whitelist().is_empty());
    }

    #[test]
    fn readers_never_see_mixed_snapshots() {
        let store = Arc::new(PolicyStore::new(PolicySnapshot::new(
            vec!["gen0".into()],
            vec!["gen0".into()],
            vec![],
        )));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    for _ in 0..2_000 {
                        let snap = store.current();
                        assert_eq!(snap.whitelist().entries(), snap.blacklist().entries());
                    }
                })
            })
            .collect();

        for generation in 1..200 {
            let tag = format!("gen{}", generation);
            store.install(PolicySnapshot::new(vec![tag.clone()], vec![tag], vec![]));
        }

        for r in readers {
            r.join().unwrap();
        }
    }
}
