//! wsync CLI - propagate synced workflow files to a fleet of repositories

mod ci;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wsync_core::{Config, ConfigOverrides, Secrets};

use commands::{SyncArgs, SyncRepoArgs, TagArgs};

/// wsync: keep CI workflows in sync across repositories
#[derive(Parser, Debug)]
#[command(name = "wsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.config/wsync/config.toml)
    #[arg(long, global = true, env = "WSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Checkout of the source repository
    #[arg(short = 'C', long, global = true, default_value = ".")]
    source_dir: PathBuf,

    /// Source repository as owner/name (detected from origin when unset)
    #[arg(long, global = true)]
    source_repository: Option<String>,

    /// Directory for target clones
    #[arg(long, global = true)]
    clone_root: Option<PathBuf>,

    /// Base URL of the git host
    #[arg(long, global = true)]
    remote_base: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Sync workflows to every target repository
    Sync(SyncArgs),

    /// Sync workflows to a single repository
    SyncRepo(SyncRepoArgs),

    /// Create or move the version tag and report whether a sync is needed
    Tag(TagArgs),

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let overrides = ConfigOverrides {
        source_repository: cli.source_repository.clone(),
        repos_file: match &cli.command {
            Some(Commands::Sync(args)) => args.repos_file.clone(),
            _ => None,
        },
        clone_root: cli.clone_root.clone(),
        remote_base: cli.remote_base.clone(),
    };
    let config = Config::load_with_overrides(cli.config.as_deref(), overrides)?;

    if cli.verbose {
        tracing::debug!(?config, "Configuration loaded");
    }

    let source_dir = if cli.source_dir.is_absolute() {
        cli.source_dir.clone()
    } else {
        std::env::current_dir()?.join(&cli.source_dir)
    };

    match cli.command {
        Some(Commands::Version) => {
            println!("wsync {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Sync(args)) => {
            args.execute(&config, &source_dir).await?;
        }
        Some(Commands::SyncRepo(args)) => {
            args.execute(&config, &source_dir).await?;
        }
        Some(Commands::Tag(args)) => {
            args.execute(&config, &source_dir)?;
        }
        Some(Commands::Config) => print_config(&config)?,
        None => {
            println!("wsync - keep CI workflows in sync across repositories");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn print_config(config: &Config) -> anyhow::Result<()> {
    let secrets = Secrets::load()?;
    let set = |token: Option<String>| if token.is_some() { "(set)" } else { "(not set)" };

    println!("wsync Configuration");
    println!("===================");
    println!();
    println!("Source:");
    println!(
        "  repository: {}",
        config.source.repository.as_deref().unwrap_or("(from origin)")
    );
    println!("  workflow_dir: {}", config.source.workflow_dir);
    println!("  repos_file: {}", config.source.repos_file);
    println!();
    println!("Sync:");
    println!("  feature_branch: {}", config.sync.feature_branch);
    println!("  pr_title: {}", config.sync.pr_title);
    println!("  commit_message: {}", config.sync.commit_message);
    println!("  reference_token: {}", config.sync.reference_token);
    println!("  clone_root: {}", config.sync.clone_root()?.display());
    println!();
    println!("Git:");
    println!("  remote_base: {}", config.git.remote_base);
    println!("  api_base: {}", config.git.api_base);
    println!(
        "  identity: {} <{}>",
        config.git.user_name, config.git.user_email
    );
    println!();
    println!("Tags:");
    println!("  last_synced: {}", config.tags.last_synced);
    println!();
    println!("Credentials:");
    println!("  author token: {}", set(secrets.author_token()));
    println!("  approver token: {}", set(secrets.approver_token()));
    println!();
    if let Some(path) = Config::default_config_path() {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }

    Ok(())
}
