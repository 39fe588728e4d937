//! Read/replace access to the policy for the admin surface.
//!
//! Replacement validates the new texts before touching disk, writes them to
//! the configured files, then installs the parsed snapshot under the reload
//! lock so it cannot interleave with a scheduled reload.
//!
//! The three files change together or not at all: texts are staged next to
//! their targets and renamed into place only once every stage succeeded. A
//! failed rename puts back the files already moved.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use super::loader;
use super::reload::ReloadScheduler;
use super::snapshot::PolicySnapshot;
use crate::error::{HourgateError, Result};

#[derive(Clone)]
pub struct PolicyAdmin {
    scheduler: Arc<ReloadScheduler>,
}

impl PolicyAdmin {
    pub fn new(scheduler: Arc<ReloadScheduler>) -> Self {
        Self { scheduler }
    }

    pub fn snapshot(&self) -> Arc<PolicySnapshot> {
        self.scheduler.store().current()
    }

    pub fn whitelist_text(&self) -> String {
        self.snapshot().whitelist().to_text()
    }

    pub fn blacklist_text(&self) -> String {
        self.snapshot().blacklist().to_text()
    }

    pub fn rules_text(&self) -> String {
        self.snapshot().rules_text()
    }

    /// Persist new policy texts and install them immediately.
    ///
    /// Malformed rules are rejected before any file is written. If writing
    /// fails, the files on disk and the installed snapshot are both left as
    /// they were.
    pub fn replace_policy(
        &self,
        whitelist: &str,
        blacklist: &str,
        rules: &str,
    ) -> Result<Arc<PolicySnapshot>> {
        let parsed = loader::from_texts(self.scheduler.sources(), whitelist, blacklist, rules)?;
        let installed = self.scheduler.install_with(|sources| {
            write_all(&[
                (sources.whitelist.as_path(), whitelist),
                (sources.blacklist.as_path(), blacklist),
                (sources.rules.as_path(), rules),
            ])?;
            Ok(parsed)
        })?;
        info!("Policy replaced via admin API");
        Ok(installed)
    }

    /// Re-read the policy files now, bypassing the reload interval.
    pub fn reload(&self) -> Result<Arc<PolicySnapshot>> {
        self.scheduler.reload_now()?;
        Ok(self.snapshot())
    }
}

/// Write every `(path, text)` pair, or leave all paths untouched.
fn write_all(files: &[(&Path, &str)]) -> Result<()> {
    let originals = files
        .iter()
        .map(|(path, _)| read_original(path))
        .collect::<Result<Vec<_>>>()?;

    let mut staged = Vec::with_capacity(files.len());
    for (path, text) in files {
        let temp = staging_path(path);
        if let Err(e) = fs::write(&temp, text) {
            staged.push(temp);
            discard(&staged);
            return Err(HourgateError::load(*path, e));
        }
        staged.push(temp);
    }

    for (done, ((path, _), temp)) in files.iter().zip(&staged).enumerate() {
        if let Err(e) = fs::rename(temp, path) {
            for ((path, _), original) in files[..done].iter().zip(&originals) {
                restore(path, original.as_deref());
            }
            discard(&staged[done..]);
            return Err(HourgateError::load(*path, e));
        }
    }
    Ok(())
}

/// Current contents of `path`; `None` when it does not exist yet.
fn read_original(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(HourgateError::load(path, e)),
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

fn restore(path: &Path, original: Option<&[u8]>) {
    let result = match original {
        Some(bytes) => fs::write(path, bytes),
        None => fs::remove_file(path),
    };
    if let Err(e) = result {
        warn!("Could not restore {} after failed write: {}", path.display(), e);
    }
}

fn discard(temps: &[PathBuf]) {
    for temp in temps {
        if let Err(e) = fs::remove_file(temp) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Could not remove {}: {}", temp.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::config::{PolicySources, ReloadInterval};
    use crate::policy::store::PolicyStore;

    fn admin_in(dir: &std::path::Path) -> PolicyAdmin {
        let sources = PolicySources {
            whitelist: dir.join("whitelist.txt"),
            blacklist: dir.join("blacklist.txt"),
            rules: dir.join("rules.txt"),
        };
        let store = Arc::new(PolicyStore::load(&sources).unwrap());
        PolicyAdmin::new(Arc::new(ReloadScheduler::new(
            store,
            sources,
            ReloadInterval::Disabled,
        )))
    }

    #[test]
    fn replace_writes_files_and_installs() {
        let dir = tempfile::tempdir().unwrap();
        let admin = admin_in(dir.path());

        admin
            .replace_policy("example.com\n", "ads.example.com\n", "games.com,22,6\n")
            .unwrap();

        assert_eq!(admin.whitelist_text(), "example.com\n");
        assert_eq!(admin.blacklist_text(), "ads.example.com\n");
        assert_eq!(admin.rules_text(), "games.com,22,6\n");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("rules.txt")).unwrap(),
            "games.com,22,6\n"
        );
    }

    #[test]
    fn replace_rejects_malformed_rules_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let admin = admin_in(dir.path());

        let err = admin
            .replace_policy("example.com\n", "", "games.com\n")
            .unwrap_err();
        assert!(matches!(err, HourgateError::PolicyLoad { .. }));
        assert!(!dir.path().join("whitelist.txt").exists());
        assert!(admin.snapshot().whitelist().is_empty());
    }

    fn seed(dir: &std::path::Path) {
        std::fs::write(dir.join("whitelist.txt"), "old.com\n").unwrap();
        std::fs::write(dir.join("blacklist.txt"), "old-ads.com\n").unwrap();
        std::fs::write(dir.join("rules.txt"), "old.com,1,2\n").unwrap();
    }

    fn assert_old_policy_on_disk(dir: &std::path::Path) {
        assert_eq!(
            std::fs::read_to_string(dir.join("whitelist.txt")).unwrap(),
            "old.com\n"
        );
        assert_eq!(
            std::fs::read_to_string(dir.join("blacklist.txt")).unwrap(),
            "old-ads.com\n"
        );
    }

    #[test]
    fn unwritable_rules_path_leaves_old_policy_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let admin = admin_in(dir.path());

        let rules = dir.path().join("rules.txt");
        std::fs::remove_file(&rules).unwrap();
        std::fs::create_dir(&rules).unwrap();

        let result = admin.replace_policy("new.com\n", "new-ads.com\n", "new.com,1,2\n");
        assert!(result.is_err());
        assert_old_policy_on_disk(dir.path());
        assert_eq!(admin.snapshot().whitelist().entries(), ["old.com"]);
        assert_eq!(admin.rules_text(), "old.com,1,2\n");

        // Once the rules file is back, a reload sees only the old policy.
        std::fs::remove_dir(&rules).unwrap();
        std::fs::write(&rules, "old.com,1,2\n").unwrap();
        let reloaded = admin.reload().unwrap();
        assert_eq!(reloaded.whitelist().entries(), ["old.com"]);
        assert_eq!(reloaded.blacklist().entries(), ["old-ads.com"]);
        assert_eq!(reloaded.rules_text(), "old.com,1,2\n");
    }

    #[test]
    fn failed_staging_removes_partial_files() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let admin = admin_in(dir.path());

        // The rules text cannot be staged; whitelist and blacklist already were.
        std::fs::create_dir(dir.path().join("rules.txt.tmp")).unwrap();

        let result = admin.replace_policy("new.com\n", "new-ads.com\n", "new.com,1,2\n");
        assert!(result.is_err());
        assert_old_policy_on_disk(dir.path());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("rules.txt")).unwrap(),
            "old.com,1,2\n"
        );
        assert!(!dir.path().join("whitelist.txt.tmp").exists());
        assert!(!dir.path().join("blacklist.txt.tmp").exists());
        assert_eq!(admin.snapshot().whitelist().entries(), ["old.com"]);
    }

    #[test]
    fn rename_failure_rolls_back_moved_files() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let whitelist = dir.path().join("whitelist.txt");
        let fresh = dir.path().join("fresh.txt");

        // Both entries stage to the same temp file, so the third rename finds
        // nothing to move after the first two already landed.
        let result = write_all(&[
            (whitelist.as_path(), "new.com\n"),
            (fresh.as_path(), "fresh\n"),
            (whitelist.as_path(), "newer.com\n"),
        ]);
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&whitelist).unwrap(), "old.com\n");
        assert!(!fresh.exists());
        assert!(!dir.path().join("whitelist.txt.tmp").exists());
        assert!(!dir.path().join("fresh.txt.tmp").exists());
    }

    #[test]
    fn replaced_policy_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let admin = admin_in(dir.path());
        let installed = admin
            .replace_policy("# comment\nexample.com\n", "", "")
            .unwrap();

        let reloaded = admin.reload().unwrap();
        assert!(installed.same_policy(&reloaded));
        assert_eq!(reloaded.whitelist().entries(), ["example.com"]);
    }
}
