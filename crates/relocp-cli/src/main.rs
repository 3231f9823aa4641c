//! relocp - one-shot supervised data migration tool
//!
//! Copies a user's data from a mounted source to a local target exactly
//! once, surviving crashes and restarts: progress is checkpointed to a
//! state file after every file, and a watchdog supervisor restarts a hung
//! engine within a bounded budget.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use console::style;
use relocp_config::{Config, ConfigLoader};
use relocp_engine::MigrationEngine;
use relocp_state::{HeartbeatView, StateStore};
use relocp_supervisor::{SuperviseOutcome, Supervisor, SupervisorRecord};
use relocp_types::Phase;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

mod progress;
mod report;

/// relocp - resumable one-shot data migration with a watchdog supervisor
#[derive(Parser)]
#[command(
    name = "relocp",
    version = env!("CARGO_PKG_VERSION"),
    about = "Resumable one-shot data migration tool",
    long_about = "relocp migrates a user's data from a mounted source to a local\n\
                  target exactly once. Progress is checkpointed after every file,\n\
                  so a crash or restart resumes instead of recopying, and the\n\
                  supervise mode watches the engine's heartbeat and restarts a\n\
                  hung migration within a bounded budget."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Quiet mode - minimal output
    #[arg(short, long)]
    quiet: bool,

    /// Verbose mode - detailed output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the migration engine once, resuming any prior progress
    Run {
        /// Write a Markdown report to this path when the run ends
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Supervise the engine: launch it, watch its heartbeat, restart on hang
    Supervise,
    /// Show migration phase, heartbeat age, and supervisor bookkeeping
    Status,
    /// Render the Markdown migration report from the state file
    Report {
        /// Write to this path instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show or generate configuration
    Config {
        /// Show the built-in defaults instead of the effective config
        #[arg(long)]
        default: bool,
        /// Write a commented default configuration file to this path
        #[arg(long)]
        generate: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_logging(cli.debug, cli.quiet, cli.verbose, &config);

    match cli.command {
        Commands::Run { report } => run_command(config, cli.quiet, report).await,
        Commands::Supervise => supervise_command(config).await,
        Commands::Status => status_command(&config),
        Commands::Report { output } => report_command(&config, output),
        Commands::Config { default, generate } => config_command(&config, default, generate),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(p) => ConfigLoader::load_from_file(p)
            .with_context(|| format!("failed to load configuration from {}", p.display())),
        None => ConfigLoader::load_default().context("failed to load configuration"),
    }
}

fn init_logging(debug: bool, quiet: bool, verbose: bool, config: &Config) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else if quiet {
        "error"
    } else {
        config.logging.level.as_str()
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_command(config: Config, quiet: bool, report_path: Option<PathBuf>) -> Result<()> {
    info!("relocp v{} starting migration run", env!("CARGO_PKG_VERSION"));

    let engine = Arc::new(MigrationEngine::new(config.clone()));

    // SIGTERM from the supervisor (or Ctrl-C) requests a graceful stop:
    // the in-flight file finishes and is checkpointed before exit
    let sig_engine = engine.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("shutdown signal received");
        sig_engine.cancel();
    });

    let bar = if quiet {
        None
    } else {
        Some(progress::spawn(engine.state()))
    };

    let outcome = engine.run().await?;

    if let Some(bar) = bar {
        bar.finish().await;
    }

    if let Some(path) = report_path {
        std::fs::write(&path, report::render(&outcome.state, &config))
            .with_context(|| format!("failed to write report to {}", path.display()))?;
    }

    if !quiet {
        print_summary(&outcome.state);
    }

    if outcome.is_success() {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

async fn supervise_command(config: Config) -> Result<()> {
    info!("relocp v{} starting supervisor", env!("CARGO_PKG_VERSION"));

    let mut supervisor = Supervisor::new(config)?;
    match supervisor.supervise().await? {
        SuperviseOutcome::Completed => {
            println!("{} Migration completed", style("✓").green().bold());
            Ok(())
        }
        SuperviseOutcome::BudgetExhausted => {
            eprintln!(
                "{} Restart budget exhausted after {} restarts",
                style("✗").red().bold(),
                supervisor.restarts()
            );
            std::process::exit(1);
        }
    }
}

fn status_command(config: &Config) -> Result<()> {
    let store = StateStore::new(config.state.file.clone());

    match HeartbeatView::read(&store)? {
        Some(view) => {
            println!("Phase: {}", style(view.phase).cyan());
            match view.age(Utc::now()) {
                Some(age) => println!("Heartbeat age: {}s", age.as_secs()),
                None => println!("Heartbeat age: {}", style("none").yellow()),
            }
        }
        None => println!("Phase: {}", style("no migration state").yellow()),
    }

    if let Some(state) = store.load()? {
        println!(
            "Progress: {}/{} files ({:.1}%)",
            state.counted_files(),
            state.total_files,
            state.progress_percent()
        );
        println!(
            "Copied: {}  Renamed: {}  Skipped: {}  Errors: {}",
            state.files_copied,
            state.files_renamed,
            state.files_skipped,
            state.copy_errors_count
        );
    }

    match SupervisorRecord::load(&config.state.supervisor_file) {
        Some(record) => {
            println!("Supervisor restarts: {}", record.restart_count);
            match record.child_pid {
                Some(pid) => println!("Engine pid: {}", pid),
                None => println!("Engine pid: {}", style("not running").yellow()),
            }
        }
        None => println!("Supervisor: {}", style("no record").yellow()),
    }

    Ok(())
}

fn report_command(config: &Config, output: Option<PathBuf>) -> Result<()> {
    let store = StateStore::new(config.state.file.clone());
    let state = store
        .load()?
        .context("no migration state found; nothing to report")?;

    let rendered = report::render(&state, config);
    match output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            println!("{} Report written to {}", style("✓").green(), path.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

fn config_command(config: &Config, default: bool, generate: Option<PathBuf>) -> Result<()> {
    if let Some(path) = generate {
        ConfigLoader::generate_default_config(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!(
            "{} Default configuration written to {}",
            style("✓").green(),
            path.display()
        );
        return Ok(());
    }

    let shown = if default { &Config::default() } else { config };
    let yaml = serde_yaml::to_string(shown).context("failed to render configuration")?;
    print!("{}", yaml);
    Ok(())
}

fn print_summary(state: &relocp_state::MigrationState) {
    println!();
    println!("{}", style("Migration Summary:").bold().underlined());
    println!("  Phase: {}", phase_styled(state.phase));
    println!("  Total files: {}", state.total_files);
    println!("  Copied: {}", style(state.files_copied).green());
    println!("  Renamed: {}", style(state.files_renamed).cyan());
    println!("  Skipped: {}", style(state.files_skipped).yellow());
    println!(
        "  Copy errors: {}",
        if state.copy_errors_count > 0 {
            style(state.copy_errors_count).red()
        } else {
            style(state.copy_errors_count).green()
        }
    );
    println!("  Verified: {}", style(state.files_verified).green());
    println!(
        "  Discrepancies: {}",
        if state.discrepancies.is_empty() {
            style(state.discrepancies.len()).green()
        } else {
            style(state.discrepancies.len()).red()
        }
    );
    println!(
        "  Data copied: {}",
        style(report::format_size(state.copied_size_bytes)).blue()
    );
}

fn phase_styled(phase: Phase) -> console::StyledObject<Phase> {
    match phase {
        Phase::Completed => style(phase).green().bold(),
        Phase::Failed => style(phase).red().bold(),
        _ => style(phase).cyan(),
    }
}
