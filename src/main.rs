//! icstatus CLI
//!
//! Inspect profile snapshots and print how each inline cache classifies.

use clap::{Parser, Subcommand};
use icstatus::{ClassifierConfig, ProfileSnapshot, VERSION};
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::EnvFilter;

#[derive(Parser)]
#[command(name = "icstatus")]
#[command(author, version, about = "Classify inline-cache feedback in profile snapshots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Classifier thresholds as a JSON file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every code block with each site's status
    Dump {
        /// Snapshot file (.json or binary)
        snapshot: PathBuf,
        /// Only dump this code block
        #[arg(short, long)]
        block: Option<String>,
    },

    /// Classify a single site
    Classify {
        /// Snapshot file (.json or binary)
        snapshot: PathBuf,
        /// Code block name
        #[arg(short, long)]
        block: String,
        /// Bytecode index of the site
        #[arg(short, long)]
        index: u32,
    },

    /// Check that every reference in a snapshot resolves
    Validate {
        /// Snapshot file (.json or binary)
        snapshot: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    tracing::debug!(version = VERSION, "icstatus starting");

    let config = match &cli.config {
        Some(path) => match ClassifierConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error reading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => ClassifierConfig::default(),
    };

    let result = match cli.command {
        Commands::Dump { snapshot, block } => dump(&snapshot, block.as_deref(), &config),
        Commands::Classify {
            snapshot,
            block,
            index,
        } => classify(&snapshot, &block, index, &config),
        Commands::Validate { snapshot } => validate(&snapshot),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise the level follows the `-v` count
fn setup_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(path: &Path) -> icstatus::Result<ProfileSnapshot> {
    let snapshot = ProfileSnapshot::load(path)?;
    snapshot.validate()?;
    Ok(snapshot)
}

fn dump(path: &Path, only: Option<&str>, config: &ClassifierConfig) -> icstatus::Result<()> {
    let snapshot = load(path)?;
    match only {
        Some(name) => {
            let block = snapshot.profiled_block(name, config)?;
            print!("{}", block.dump_statuses());
        }
        None => {
            for profile in &snapshot.code_blocks {
                let block = snapshot.profiled_block(profile.name(), config)?;
                println!("{}", block.dump_statuses());
            }
        }
    }
    Ok(())
}

fn classify(path: &Path, name: &str, index: u32, config: &ClassifierConfig) -> icstatus::Result<()> {
    let snapshot = load(path)?;
    let block = snapshot.profiled_block(name, config)?;
    println!("{}", block.dump_site(index)?);
    Ok(())
}

fn validate(path: &Path) -> icstatus::Result<()> {
    let snapshot = ProfileSnapshot::load(path)?;
    snapshot.validate()?;
    println!(
        "{}: ok ({} code blocks, {} structures)",
        path.display(),
        snapshot.code_blocks.len(),
        snapshot.heap.structures().count()
    );
    Ok(())
}
