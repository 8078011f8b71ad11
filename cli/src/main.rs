//! Trackwall command-line host
//!
//! Scans a package for tracker components and blocks or unblocks them
//! through the intent firewall. Every command prints a JSON envelope:
//! `{"success": bool, "data": ..., "error": ...}`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use trackwall_core::{Config, PackageIdentity, TrackerService};

mod commands;

use commands::CommandResult;

#[derive(Parser)]
#[command(
    name = "trackwall",
    about = "Find tracker components in Android packages and block them with the intent firewall"
)]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the rule file directory
    #[arg(long, global = true)]
    rules_dir: Option<PathBuf>,

    /// Read and write rule files (requires root on a device)
    #[arg(long, global = true)]
    privileged: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a package for tracker components
    Scan {
        #[command(flatten)]
        target: Target,

        /// Only show trackers whose name, category or signature contains this
        #[arg(short, long)]
        keyword: Option<String>,
    },

    /// Block tracker components
    Block {
        #[command(flatten)]
        target: Target,

        /// Fully-qualified component class names
        #[arg(required = true)]
        components: Vec<String>,
    },

    /// Remove blocking rules for tracker components
    Unblock {
        #[command(flatten)]
        target: Target,

        /// Fully-qualified component class names
        #[arg(required = true)]
        components: Vec<String>,
    },

    /// Show the rule file of a package
    Rules {
        /// Package name
        package: String,
    },
}

#[derive(clap::Args)]
struct Target {
    /// Package name
    package: String,

    /// Decoded manifest (or directory holding one) used when the package is not installed
    #[arg(short, long)]
    archive: Option<PathBuf>,
}

impl Target {
    fn identity(&self) -> PackageIdentity {
        let identity = PackageIdentity::new(self.package.clone());
        match &self.archive {
            Some(path) => identity.with_archive(path.clone()),
            None => identity,
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(rules_dir) = &cli.rules_dir {
        config.rules_dir = rules_dir.clone();
    }
    if cli.privileged {
        config.use_privileged_access = true;
    }

    Ok(config)
}

fn print<T: Serialize>(result: &CommandResult<T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    trackwall_core::init_logging();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    tracing::debug!(
        rules_dir = %config.rules_dir.display(),
        privileged = config.use_privileged_access,
        "Configuration ready"
    );

    let identity = match &cli.command {
        Commands::Scan { target, .. }
        | Commands::Block { target, .. }
        | Commands::Unblock { target, .. } => target.identity(),
        Commands::Rules { package } => PackageIdentity::new(package.clone()),
    };

    let service = TrackerService::from_config(&config, identity)?;

    let success = match &cli.command {
        Commands::Scan { keyword, .. } => {
            let result = commands::scan(&service, keyword.clone()).await;
            print(&result)?;
            result.success
        }
        Commands::Block { components, .. } => {
            let result = commands::block(&service, components).await;
            print(&result)?;
            result.success
        }
        Commands::Unblock { components, .. } => {
            let result = commands::unblock(&service, components).await;
            print(&result)?;
            result.success
        }
        Commands::Rules { .. } => {
            let result = commands::rules(&service).await;
            print(&result)?;
            result.success
        }
    };

    if !success {
        std::process::exit(1);
    }

    Ok(())
}
