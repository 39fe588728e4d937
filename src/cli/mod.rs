use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "hourgate")]
#[command(about = "Whitelist, blacklist and time-window access policy for HTTP proxies")]
#[command(version)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "hourgate.toml")]
    pub config: PathBuf,

    /// Logging level (overrides the config file)
    #[arg(short, long)]
    pub verbose: Option<u8>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load the policy, keep it fresh and serve the admin API
    Start,
    /// Evaluate one host against the policy files
    Check {
        /// Destination host (a port suffix is ignored)
        host: String,
        /// Request path, used for the audit record
        #[arg(long, default_value = "/")]
        path: String,
        /// Hour of day to evaluate at (defaults to the local hour)
        #[arg(long, value_parser = clap::value_parser!(i32).range(0..24))]
        hour: Option<i32>,
    },
    /// Policy inspection
    Policy {
        #[command(subcommand)]
        action: PolicyAction,
    },
}

#[derive(Subcommand)]
pub enum PolicyAction {
    /// Show the current whitelist, blacklist and rules
    Show,
}
