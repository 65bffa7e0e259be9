//! Ear Dojo - Melodic Ear Training
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ear_dojo::cli::catalog::{CatalogCommand, CatalogOptions};
use ear_dojo::cli::drill::{DrillCommand, DrillOptions, DrillTarget, TerminalPlayer};
use ear_dojo::cli::reset::{ResetCommand, ResetOptions};
use ear_dojo::cli::stats::{StatsCommand, StatsOptions};
use ear_dojo::cli::sync::{SyncCommand, SyncOptions};
use ear_dojo::config::{dojo_home, Config};
use ear_dojo::core::{catalog, Level};
use ear_dojo::profile::ProfileManager;
use ear_dojo::storage::{DirectoryRemoteStore, FileProfileStore, StaticIdentity};

// =============================================================================
// CLI Definition
// =============================================================================

/// Ear Dojo - Melodic Ear Training
#[derive(Parser)]
#[command(name = "ear-dojo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the curriculum with lock state and best scores
    Catalog {
        /// Only show one tier (beginner, intermediate, master)
        #[arg(long, short, value_parser = parse_level)]
        level: Option<Level>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show level, hearts, streak, and weak spots
    Stats {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Clear the stored profile
    Reset {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Reconcile the local profile with the remote copy
    Sync {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Run an interactive drill session
    Drill {
        #[command(subcommand)]
        target: DrillArg,
        /// Draw only from weak spots
        #[arg(long, global = true)]
        weak: bool,
        /// Print note names during playback
        #[arg(long, global = true)]
        show_notes: bool,
        /// Output the result as JSON
        #[arg(long, short, global = true)]
        json: bool,
        /// Suppress the result
        #[arg(long, short, global = true)]
        quiet: bool,
    },
}

#[derive(Subcommand)]
enum DrillArg {
    /// Single notes from unlocked material
    Dojo,
    /// Endless practice at a difficulty
    Practice {
        /// beginner, intermediate, or master
        #[arg(value_parser = parse_level)]
        difficulty: Level,
    },
    /// A catalog challenge or exam
    Challenge {
        /// Challenge id
        id: u32,
    },
}

impl From<DrillArg> for DrillTarget {
    fn from(arg: DrillArg) -> Self {
        match arg {
            DrillArg::Dojo => DrillTarget::Dojo,
            DrillArg::Practice { difficulty } => DrillTarget::Practice(difficulty),
            DrillArg::Challenge { id } => DrillTarget::Challenge(id),
        }
    }
}

fn parse_level(value: &str) -> Result<Level, String> {
    Level::parse(value).ok_or_else(|| {
        format!(
            "unknown level '{}' (expected beginner, intermediate, or master)",
            value
        )
    })
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    init_tracing();
    setup_panic_handler();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ear-dojo error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("EAR_DOJO_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("ear-dojo panic: {}", info);

        if let Some(home) = dojo_home() {
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(2);
    }));
}

fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load_fail_open();

    match cli.command {
        Commands::Catalog { level, json, quiet } => run_catalog(level, json, quiet),
        Commands::Stats { json, quiet } => run_stats(json, quiet),
        Commands::Reset { json, quiet } => run_reset(json, quiet),
        Commands::Sync { json, quiet } => run_sync(&config, json, quiet),
        Commands::Drill {
            target,
            weak,
            show_notes,
            json,
            quiet,
        } => run_drill(config, target.into(), weak, show_notes, json, quiet),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn profile_manager() -> Result<ProfileManager<FileProfileStore>, Box<dyn std::error::Error>> {
    Ok(ProfileManager::new(FileProfileStore::new()?, catalog::generate()))
}

fn identity(config: &Config) -> StaticIdentity {
    StaticIdentity(config.sync.user_id.clone())
}

fn remote(config: &Config) -> Result<DirectoryRemoteStore, Box<dyn std::error::Error>> {
    let dir = config
        .sync
        .remote_dir()
        .ok_or("Could not determine remote directory")?;
    Ok(DirectoryRemoteStore::new(dir))
}

fn print_output(formatted: &str) {
    if !formatted.is_empty() {
        println!("{}", formatted);
    }
}

fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run_catalog(
    level: Option<Level>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = CatalogCommand::new(profile_manager()?);
    let options = CatalogOptions { json, quiet, level };

    let output = cmd.run(&options);
    print_output(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_stats(json: bool, quiet: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = StatsCommand::new(profile_manager()?);
    let options = StatsOptions { json, quiet };

    let output = cmd.run(&options);
    print_output(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_reset(json: bool, quiet: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = ResetCommand::new(profile_manager()?);
    let options = ResetOptions { json, quiet };

    let output = cmd.run(&options);
    print_output(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_sync(config: &Config, json: bool, quiet: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = SyncCommand::new(profile_manager()?, identity(config), remote(config)?);
    let options = SyncOptions { json, quiet };

    let output = cmd.run(&options);
    print_output(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_drill(
    config: Config,
    target: DrillTarget,
    force_weak: bool,
    show_notes: bool,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let identity = identity(&config);
    let remote = remote(&config)?;
    let cmd = DrillCommand::new(profile_manager()?, identity, remote, config);
    let options = DrillOptions {
        json,
        quiet,
        target,
        force_weak,
    };
    let player = TerminalPlayer {
        show_notes,
        silent: false,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(async {
        let input = tokio::io::BufReader::new(tokio::io::stdin());
        let mut stdout = std::io::stdout();
        cmd.run(&player, input, &mut stdout, &options).await
    });
    print_output(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}
