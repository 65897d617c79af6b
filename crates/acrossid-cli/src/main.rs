//! # acrossid CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use acrossid_cli::decode::{run_decode, run_eids, DecodeArgs, EidsArgs};
use acrossid_cli::resolve::{run_resolve, ResolveArgs};

/// 33Across identity envelope resolver.
///
/// Resolves an identity envelope for a partner id under the given consent
/// signals, and decodes stored envelopes the way an identity host does.
#[derive(Parser, Debug)]
#[command(name = "acrossid", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve an envelope from the identity endpoint.
    Resolve(ResolveArgs),

    /// Decode a stored envelope into the host's id object.
    Decode(DecodeArgs),

    /// Assemble the third-party id list from stored values.
    Eids(EidsArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level.
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    tracing::debug!("acrossid CLI v{} starting", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Resolve(args) => run_resolve(&args),
        Commands::Decode(args) => run_decode(&args),
        Commands::Eids(args) => run_eids(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
