use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::Timelike;
use clap::Parser;
use tracing::info;

use hourgate::cli::{Cli, Commands, PolicyAction};
use hourgate::logging;
use hourgate::policy::admin::PolicyAdmin;
use hourgate::policy::config::AppConfig;
use hourgate::policy::reload::{self, ReloadScheduler};
use hourgate::policy::{DecisionEngine, PolicyStore};
use hourgate::proxy::{BlockResponse, PolicyFilter};
use hourgate::web;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;
    if let Some(verbose) = cli.verbose {
        config.policy.verbose = verbose;
    }

    logging::init(config.policy.verbose);

    match cli.command {
        Commands::Start => cmd_start(config).await?,
        Commands::Check { host, path, hour } => cmd_check(&config, &host, &path, hour)?,
        Commands::Policy { action } => match action {
            PolicyAction::Show => cmd_policy_show(&config)?,
        },
    }

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    if path.exists() {
        AppConfig::load_from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))
    } else {
        Ok(AppConfig::default())
    }
}

async fn cmd_start(config: AppConfig) -> anyhow::Result<()> {
    let sources = config.policy.sources();
    info!(
        "whitelist={}, blacklist={}, rules={}, reload_interval={}s, verbose={}",
        sources.whitelist.display(),
        sources.blacklist.display(),
        sources.rules.display(),
        config.policy.reload_interval_secs,
        config.policy.verbose
    );

    // No policy, no proxy: a failed initial load ends the process.
    let store = Arc::new(PolicyStore::load(&sources).context("initial policy load failed")?);
    let snapshot = store.current();
    info!("White list: {:?}", snapshot.whitelist().entries());
    info!("Black list: {:?}", snapshot.blacklist().entries());
    info!("Rule list: {:?}", snapshot.rules_text().lines().collect::<Vec<_>>());

    let scheduler = Arc::new(ReloadScheduler::new(
        store.clone(),
        sources,
        config.policy.reload_interval(),
    ));
    let reload_task = reload::spawn_reload_loop(scheduler.clone());
    reload::start_sighup_handler(scheduler.clone())?;

    let state = Arc::new(web::AppState {
        admin: PolicyAdmin::new(scheduler),
        token: config.admin.token.clone(),
    });
    let listen = config.admin.listen.clone();
    let server = tokio::spawn(async move { web::start(&listen, state).await });

    println!("hourgate policy engine running; admin API on {}", config.admin.listen);

    tokio::select! {
        res = server => {
            res??;
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
    }

    if let Some(task) = reload_task {
        task.abort();
    }
    Ok(())
}

fn cmd_check(config: &AppConfig, host: &str, path: &str, hour: Option<i32>) -> anyhow::Result<()> {
    let store = Arc::new(PolicyStore::load(&config.policy.sources())?);
    let filter = PolicyFilter::new(store, DecisionEngine::new(config.policy.verbose));
    let hour = hour.unwrap_or_else(|| chrono::Local::now().hour() as i32);

    let decision = filter.decide_authority(host, path, hour);
    println!("{} at {:02}:00 -> {}", host, hour, decision);
    if let Some(resp) = BlockResponse::for_decision(decision) {
        println!("  {} {}", resp.status, resp.body);
    }
    Ok(())
}

fn cmd_policy_show(config: &AppConfig) -> anyhow::Result<()> {
    let sources = config.policy.sources();
    let snapshot = PolicyStore::load(&sources)?.current();

    println!("Whitelist ({}):", sources.whitelist.display());
    for entry in snapshot.whitelist().entries() {
        println!("  {}", entry);
    }
    println!("Blacklist ({}):", sources.blacklist.display());
    for entry in snapshot.blacklist().entries() {
        println!("  {}", entry);
    }
    println!("Rules ({}):", sources.rules.display());
    for rule in snapshot.rules() {
        println!(
            "  {} min_hour={} max_hour={}",
            rule.host, rule.min_hour, rule.max_hour
        );
    }
    Ok(())
}
