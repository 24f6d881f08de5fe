use clap::Parser;

use curator_core::error::ConfigError;
use curator_core::{CuratorError, ErrorKind};

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "curator",
    version,
    about = "Review, publish, and version knowledge-graph batches"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Classify an error into a process exit code.
///
/// Exit codes:
///   0 success
///   1 general/unknown error
///   2 configuration error
///   3 repository, project, or batch not found
///   4 invalid input
///   5 version-control failure (including a publish left uncommitted)
///   6 candidate-generation job failure
///   7 timed out
///   8 conflicting request in flight
fn classify_exit_code(err: &anyhow::Error) -> i32 {
    if err.chain().any(|e| e.downcast_ref::<ConfigError>().is_some()) {
        return 2;
    }
    if let Some(err) = err.chain().find_map(|e| e.downcast_ref::<CuratorError>()) {
        if matches!(err, CuratorError::Config(_)) {
            return 2;
        }
        return match err.kind() {
            ErrorKind::NotFound => 3,
            ErrorKind::Validation => 4,
            ErrorKind::VersionControl => 5,
            ErrorKind::Job => 6,
            ErrorKind::Timeout => 7,
            ErrorKind::Conflict => 8,
            ErrorKind::Io | ErrorKind::Local => 1,
        };
    }

    let lower = format!("{err:#}").to_lowercase();
    if lower.contains("cannot resolve path") {
        3
    } else if lower.contains("config") {
        2
    } else {
        1
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: Failed to create runtime: {e}");
            std::process::exit(1);
        }
    };

    match runtime.block_on(commands::run(cli.command)) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(classify_exit_code(&e));
        }
    }
}
