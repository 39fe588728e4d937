use std::path::Path;

use hourgate::policy::config::{AppConfig, PolicySources, ReloadInterval};
use hourgate::policy::engine::decide;
use hourgate::policy::{loader, Decision};

fn write_policy(dir: &Path, whitelist: &str, blacklist: &str, rules: &str) -> PolicySources {
    let sources = PolicySources {
        whitelist: dir.join("whitelist.txt"),
        blacklist: dir.join("blacklist.txt"),
        rules: dir.join("rules.txt"),
    };
    std::fs::write(&sources.whitelist, whitelist).unwrap();
    std::fs::write(&sources.blacklist, blacklist).unwrap();
    std::fs::write(&sources.rules, rules).unwrap();
    sources
}

#[test]
fn suffix_whitelist_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let sources = write_policy(dir.path(), "example.com\n", "", "");
    let snap = loader::load(&sources).unwrap();

    assert_eq!(decide(&snap, "sub.example.com", 12), Decision::Allow);
    assert_eq!(decide(&snap, "other.com", 12), Decision::DenyListPolicy);
}

#[test]
fn blacklist_precedence_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let sources = write_policy(dir.path(), ".*\n", "ads.example.com\n", "");
    let snap = loader::load(&sources).unwrap();

    assert_eq!(decide(&snap, "ads.example.com", 12), Decision::DenyListPolicy);
    assert_eq!(decide(&snap, "news.example.com", 12), Decision::Allow);
}

#[test]
fn default_deny_for_unlisted_hosts() {
    let dir = tempfile::tempdir().unwrap();
    let sources = write_policy(
        dir.path(),
        "# work sites\nexample.com\ndocs.rs\n",
        "ads.net\n",
        "",
    );
    let snap = loader::load(&sources).unwrap();

    for host in ["crates.io", "ads.net", "localhost", ""] {
        assert_eq!(decide(&snap, host, 9), Decision::DenyListPolicy, "host {host:?}");
    }
}

#[test]
fn inverted_time_rule_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let sources = write_policy(dir.path(), "games.com\n", "", "games.com,22,6\n");
    let snap = loader::load(&sources).unwrap();

    assert_eq!(decide(&snap, "games.com", 10), Decision::DenyTimeWindow);
    assert_eq!(decide(&snap, "games.com", 23), Decision::Allow);
}

#[test]
fn ordered_time_rule_falls_through_to_lists() {
    let dir = tempfile::tempdir().unwrap();
    let sources = write_policy(dir.path(), "games.com\n", "", "games.com,6,22\n");
    let snap = loader::load(&sources).unwrap();

    for hour in 0..24 {
        assert_eq!(decide(&snap, "games.com", hour), Decision::Allow);
        assert_eq!(decide(&snap, "other.com", hour), Decision::DenyListPolicy);
    }
}

#[test]
fn non_numeric_hours_make_rule_inert() {
    let dir = tempfile::tempdir().unwrap();
    let sources = write_policy(dir.path(), "games.com\n", "", "games.com,evening,morning\n");
    let snap = loader::load(&sources).unwrap();

    // Both hours parse to 0, and no hour is both < 0 and > 0.
    for hour in 0..24 {
        assert_eq!(decide(&snap, "games.com", hour), Decision::Allow);
    }
}

#[test]
fn config_file_drives_sources() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("hourgate.toml");
    std::fs::write(
        &config_path,
        format!(
            "[policy]\nwhitelist = {:?}\nreload_interval_secs = 0\n",
            dir.path().join("allow.txt").display().to_string()
        ),
    )
    .unwrap();
    std::fs::write(dir.path().join("allow.txt"), "example.com\n").unwrap();

    let config = AppConfig::load_from_path(&config_path).unwrap();
    assert_eq!(config.policy.reload_interval(), ReloadInterval::Disabled);

    let mut sources = config.policy.sources();
    sources.blacklist = dir.path().join("missing-blacklist.txt");
    sources.rules = dir.path().join("missing-rules.txt");
    let snap = loader::load(&sources).unwrap();
    assert_eq!(decide(&snap, "www.example.com", 12), Decision::Allow);
}

#[test]
fn invalid_toml_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("hourgate.toml");
    std::fs::write(&config_path, "this is not valid toml [[[").unwrap();
    assert!(AppConfig::load_from_path(&config_path).is_err());
}
