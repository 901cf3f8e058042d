use std::path::PathBuf;

use clap::{Parser, Subcommand, builder::RangedU64ValueParser};

use crate::{
    config::settings::{DEFAULT_TIMEOUT_SECS, DEFAULT_WORKERS},
    publish::MAX_COMMITS,
};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding configurations, logs and the working copy (default: ~/JRocket)
    #[arg(long, global = true, env = "JROCKET_HOME")]
    pub home: Option<PathBuf>,

    /// Per-request webhook timeout, in seconds
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,

    /// Webhooks sent at the same time
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_WORKERS,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub workers: usize,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Manage named configurations
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Sync the repository and list the files changed by the last commits
    Changes {
        name: String,
        #[arg(
            short = 'n',
            long,
            default_value_t = 1,
            value_parser = clap::value_parser!(u64).range(1..=MAX_COMMITS as u64)
        )]
        commits: u64,
    },

    /// Send webhooks for the given paths, or for every matched change with --all
    Push {
        name: String,
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        paths: Vec<String>,
        #[arg(short = 'a', long)]
        all: bool,
        #[arg(
            short = 'n',
            long,
            default_value_t = 1,
            value_parser = clap::value_parser!(u64).range(1..=MAX_COMMITS as u64)
        )]
        commits: u64,
    },

    /// Docker daemon and buildx builder checks
    #[command(subcommand)]
    Docker(DockerCommands),

    /// Show the last lines of the log
    Logs {
        #[arg(short = 'n', long, default_value_t = 50)]
        lines: usize,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    List,
    New {
        name: String,
    },
    Show {
        name: String,
    },
    Delete {
        name: String,
    },
    /// Update repository coordinates
    Set {
        name: String,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        branch: Option<String>,
        #[arg(long)]
        cycle: Option<String>,
    },
    /// Add a path -> webhook row
    Map {
        name: String,
        path: String,
        webhook: String,
    },
    /// Remove every row for a path
    Unmap {
        name: String,
        path: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum DockerCommands {
    Status {
        /// Wait this long before probing
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
        /// buildx builder to inspect (default: the current one)
        #[arg(long)]
        builder: Option<String>,
    },
    Info,
}
