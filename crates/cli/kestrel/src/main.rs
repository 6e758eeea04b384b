//! Kestrel compiler CLI
//!
//! Main entry point for the Kestrel compiler front end

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    reason = "the CLI reports results on stdout and diagnostics on stderr"
)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use ks_driver::{Driver, Options};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod check;
mod eval;
mod expand;

#[derive(Parser)]
#[command(name = "kestrel")]
#[command(about = "Kestrel compiler front end", long_about = None)]
#[command(version)]
struct Cli {
    /// Options file; defaults to Kestrel.toml next to the entry file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log every compiler phase
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a Kestrel file for errors
    Check {
        /// Entry source file
        path: PathBuf,
    },

    /// Evaluate and print every constant
    Eval {
        /// Entry source file
        path: PathBuf,

        /// Print the constants as a JSON object
        #[arg(long)]
        json: bool,
    },

    /// Print the crate root with every macro expanded
    Expand {
        /// Entry source file
        path: PathBuf,
    },
}

impl Commands {
    fn path(&self) -> &Path {
        match self {
            Self::Check { path } | Self::Eval { path, .. } | Self::Expand { path } => path,
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn,kestrel=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(verbose)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = match &cli.config {
        Some(config) => Options::load(config)?,
        None => Options::discover(cli.command.path())?,
    };
    tracing::debug!(?options, "starting");
    let driver = Driver::new(options)?;

    match cli.command {
        Commands::Check { path } => check::check(&driver, &path),
        Commands::Eval { path, json } => eval::eval(&driver, &path, json),
        Commands::Expand { path } => expand::expand(&driver, &path),
    }
}

/// Prints rendered diagnostics and turns them into the command's failure
fn report(driver: &Driver, errors: &[ks_driver::CompileError]) -> anyhow::Error {
    use colored::Colorize;

    eprint!("{}", driver.render_diagnostics(errors));
    let noun = if errors.len() == 1 { "error" } else { "errors" };
    eprintln!(
        "{} could not compile due to {} previous {noun}",
        "error:".red().bold(),
        errors.len()
    );
    anyhow::anyhow!("compilation failed with {} {noun}", errors.len())
}
