#![deny(unsafe_code)]

mod commands;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{decode, dirstream, encode};

/// Inspect kfuse request frames and directory containers
#[derive(Parser)]
#[command(name = "kfusectl")]
#[command(author, version)]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
    # List the records in a GETDIR container
    kfusectl dirstream ./listing.bin

    # Build a LOOKUP frame for \"notes.txt\" under the root
    kfusectl encode lookup 1 notes.txt

    # Take a captured frame apart
    kfusectl decode 0100000001000000000000000a0000006e6f7465732e74787400
")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the records of a directory container file
    Dirstream(dirstream::Args),

    /// Build a request frame and print it as hex
    Encode(encode::Args),

    /// Decode a hex request frame
    Decode(decode::Args),
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    match cli.command {
        Commands::Dirstream(args) => dirstream::execute(&args),
        Commands::Encode(args) => encode::execute(&args),
        Commands::Decode(args) => decode::execute(&args),
    }
}

fn setup_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();
}
