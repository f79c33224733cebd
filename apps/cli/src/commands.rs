//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use rostersync_core::{PrStatus, ProgressReporter, PublishOutcome, RunMode, SyncConfig, SyncResult};
use rostersync_shared::{AppConfig, init_config, load_config, load_config_from, resolve_secrets};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// RosterSync — keep the website team page in sync with the roster sheet.
#[derive(Parser)]
#[command(
    name = "rostersync",
    version,
    about = "Synchronize the team roster from the sheet into the website databag.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file path (defaults to ~/.rostersync/rostersync.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build and write the databag locally, without touching remote git/PR state.
    Local,

    /// Complete pipeline: build, commit, push, and open a pull request.
    Full,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Local => cmd_sync(RunMode::Local, cli.config.as_deref()).await,
        Command::Full => cmd_sync(RunMode::Full, cli.config.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(cli.config.as_deref()),
        },
    }
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

async fn cmd_sync(mode: RunMode, config_path: Option<&std::path::Path>) -> Result<()> {
    let app = load_app_config(config_path)?;
    let secrets = resolve_secrets(&app.secrets)?;
    let work_dir = PathBuf::from(&app.repo.local_path);

    let config = SyncConfig {
        app,
        secrets,
        work_dir,
    };

    let progress = SpinnerProgress::new();
    let result = rostersync_core::run(mode, &config, &progress).await?;

    print_summary(mode, &result);
    Ok(())
}

fn print_summary(mode: RunMode, result: &SyncResult) {
    println!(
        "Synced {} members across {} committees ({} excluded, {} rejected, {} images).",
        result.members,
        result.committees,
        result.excluded,
        result.rejections.len(),
        result.images_attached,
    );

    for rejection in &result.rejections {
        println!(
            "  row {} skipped: {}",
            rejection.row,
            rejection.name.as_deref().unwrap_or("(no name)")
        );
    }

    match (&mode, &result.publish) {
        (RunMode::Local, _) => {
            println!("Local update completed; databag changed: {}.", result.databag_changed);
        }
        (RunMode::Full, Some(outcome)) => match outcome {
            PublishOutcome::Unchanged => {
                println!("No changes against the published state; nothing pushed.");
            }
            PublishOutcome::Pushed { pull_request } => match pull_request {
                PrStatus::Created { number } => {
                    println!("Changes pushed; pull request #{number} created.");
                }
                PrStatus::AlreadyOpen { number } => {
                    println!("Changes pushed; pull request #{number} already open.");
                }
                PrStatus::Failed => {
                    println!("Changes pushed, but pull request creation failed; see logs.");
                }
            },
        },
        (RunMode::Full, None) => {}
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn load_app_config(path: Option<&std::path::Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Wrote default config to {}", path.display());
    println!("Edit [repo] and [columns], then set the secret environment variables.");
    Ok(())
}

fn cmd_config_show(path: Option<&std::path::Path>) -> Result<()> {
    let config = load_app_config(path)?;
    let rendered = toml::to_string_pretty(&config).map_err(|e| eyre!("render config: {e}"))?;
    print!("{rendered}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Progress spinner
// ---------------------------------------------------------------------------

/// Phase spinner for interactive runs.
struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}").expect("static spinner template"),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(120));
        Self { bar }
    }
}

impl ProgressReporter for SpinnerProgress {
    fn phase(&self, name: &str) {
        info!(phase = name, "entering phase");
        self.bar.set_message(name.to_string());
    }

    fn done(&self, _result: &SyncResult) {
        self.bar.finish_and_clear();
    }
}
