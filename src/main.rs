use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gitspace::health::CheckResult;
use gitspace::{editor, workspace, Config, ConsoleSink, HealthCheck, SyncEngine};

#[derive(Parser)]
#[command(name = "gitspace")]
#[command(about = "Keep a local workspace tree mirroring git remotes by URL")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Workspace root, overriding the configuration file
    #[arg(short, long, global = true, env = "GITSPACE_WORKSPACE")]
    workspace: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone a repository into the workspace, or pull it if already there
    #[command(alias = "get")]
    Clone {
        /// Remote URL, e.g. git@github.com:acme/widgets.git
        url: String,

        /// Fetch only the latest commit (--depth 1)
        #[arg(short, long)]
        shallow: bool,

        /// Do not open the checkout in the editor afterwards
        #[arg(long)]
        no_open: bool,
    },

    /// Print the workspace path a remote maps to
    Path {
        /// Remote URL
        url: String,
    },

    /// List checkouts in the workspace
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the configuration file and create the workspace root
    Init {
        /// Workspace root
        #[arg(long, default_value = "~/Workspace")]
        workspace_dir: String,
    },

    /// System health check and diagnostics
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, created) = load_config(cli.config.clone())?;
    if let Some(workspace) = &cli.workspace {
        config.workspace_dir = workspace.clone();
        config.expand_paths()?;
    }

    init_logging(cli.verbose, &config.logging.level)?;
    debug!("Starting gitspace v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = created {
        info!("Created default configuration at: {:?}", path);
    }

    match cli.command {
        Commands::Clone {
            url,
            shallow,
            no_open,
        } => cmd_clone(&url, shallow, no_open, &config).await,
        Commands::Path { url } => cmd_path(&url, &config),
        Commands::List { json } => cmd_list(json, &config),
        Commands::Init { workspace_dir } => cmd_init(workspace_dir, cli.config, &config),
        Commands::Doctor => cmd_doctor(&config),
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool, level: &str) -> Result<()> {
    let default_level = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

/// Load configuration from specified path or default location.
/// Also returns the default path when it was written by this run.
fn load_config(config_path: Option<PathBuf>) -> Result<(Config, Option<PathBuf>)> {
    match config_path {
        Some(path) if path.exists() => Ok((Config::load(&path)?, None)),
        Some(_) => {
            let mut config = Config::default();
            config.expand_paths()?;
            Ok((config, None))
        }
        None => {
            let default_path = Config::default_config_path()?;
            let created = (!default_path.exists()).then_some(default_path);
            Ok((Config::load_or_default()?, created))
        }
    }
}

/// Clone or pull a repository, then open it
async fn cmd_clone(url: &str, shallow: bool, no_open: bool, config: &Config) -> Result<()> {
    let sink = ConsoleSink;
    let engine = SyncEngine::from_config(config);

    let result = match engine.sync(url, shallow || config.git.shallow, &sink).await {
        Ok(result) => result,
        // Already reported by the sink
        Err(_) => std::process::exit(1),
    };

    info!(
        "{} {:?} at {}",
        result.relative_label,
        result.action,
        result.target_path.display()
    );

    if config.editor.open_after_sync && !no_open {
        editor::open(engine.runner(), &config.editor.command, &result.target_path, &sink).await;
    }

    Ok(())
}

/// Print the resolved path without touching disk
fn cmd_path(url: &str, config: &Config) -> Result<()> {
    let engine = SyncEngine::from_config(config);
    let (_, target) = engine.locate(url)?;
    println!("{}", target.absolute_path.display());
    Ok(())
}

/// List checkouts under the workspace root
fn cmd_list(json: bool, config: &Config) -> Result<()> {
    let repos = workspace::discover(&config.workspace_path())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&repos)?);
        return Ok(());
    }

    println!("Repositories ({}): ", repos.len());
    for repo in repos {
        println!("  📁 {}", repo.label);
    }

    Ok(())
}

/// Write configuration and create the workspace root
fn cmd_init(workspace_dir: String, config_path: Option<PathBuf>, config: &Config) -> Result<()> {
    let expanded = shellexpand::full(&workspace_dir)?.into_owned();
    std::fs::create_dir_all(&expanded)
        .with_context(|| format!("Failed to create workspace: {}", expanded))?;

    let mut new_config = config.clone();
    new_config.workspace_dir = workspace_dir;

    let config_path = match config_path {
        Some(path) => path,
        None => Config::default_config_path()?,
    };
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    new_config.save(&config_path)?;

    println!("✅ gitspace initialized successfully!");
    println!("   Config: {:?}", config_path);
    println!("   Workspace: {}", expanded);

    Ok(())
}

/// System health check and diagnostics
fn cmd_doctor(config: &Config) -> Result<()> {
    let health = HealthCheck::run(config);
    print_health_report(&health);

    if !health.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}

/// Print health check report to stdout
fn print_health_report(health: &HealthCheck) {
    fn print_check(name: &str, result: &CheckResult) {
        println!("{}:", name);
        let icon = if result.passed {
            if result.is_warning { "⚠️ " } else { "✅" }
        } else {
            "❌"
        };
        println!("  {} {}", icon, result.message);
        if let Some(details) = &result.details {
            for line in details.lines() {
                println!("     {}", line);
            }
        }
    }

    println!("🔍 gitspace System Diagnostics");
    println!();

    for (name, result) in health.all_checks() {
        print_check(name, result);
        println!();
    }

    let (errors, warnings) = (health.errors().len(), health.warnings().len());
    if health.all_passed() {
        println!("✅ All checks passed ({} warnings)", warnings);
    } else {
        println!("❌ {} checks failed, {} warnings", errors, warnings);
    }
}
