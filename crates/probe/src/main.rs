mod commands;
mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use common::{Environment, setup_logging};
use config::ProbeConfig;
use std::path::PathBuf;

/// Inspect and exercise 64-bit words in a shared file mapping.
#[derive(Debug, Parser)]
#[command(name = "shmap-probe", version)]
struct Cli {
    /// Backing file (overrides SHMAP_PATH)
    #[arg(long, global = true)]
    path: Option<PathBuf>,

    /// Mapping length in bytes (overrides SHMAP_SIZE)
    #[arg(long, global = true)]
    size: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the backing file or grow it to the mapping length
    Init,
    /// Print the word at OFFSET
    Read {
        #[arg(value_parser = parse_u64)]
        offset: u64,
    },
    /// Compare-and-swap the word at OFFSET
    Cas {
        #[arg(value_parser = parse_u64)]
        offset: u64,
        #[arg(value_parser = parse_u64)]
        expected: u64,
        #[arg(value_parser = parse_u64)]
        new_value: u64,
    },
    /// Atomically add one to the word at OFFSET
    Increment {
        #[arg(value_parser = parse_u64)]
        offset: u64,
    },
    /// Race several threads incrementing the word at OFFSET and check for lost updates
    Race {
        #[arg(value_parser = parse_u64)]
        offset: u64,
        /// Racing threads (overrides SHMAP_THREADS)
        #[arg(long)]
        threads: Option<usize>,
        /// Increments per thread (overrides SHMAP_ROUNDS)
        #[arg(long)]
        rounds: Option<u64>,
    },
    /// Print the OS id of the current thread
    ThreadId,
}

/// Decimal or `0x`-prefixed hexadecimal.
fn parse_u64(raw: &str) -> Result<u64, String> {
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => raw.replace('_', "").parse(),
    };
    parsed.map_err(|e| format!("invalid value '{raw}': {e}"))
}

fn offset(raw: u64) -> anyhow::Result<usize> {
    usize::try_from(raw).context("Offset does not fit in the address space")
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(Environment::from_env());

    let mut config = ProbeConfig::from_env();
    if let Some(path) = cli.path {
        config.path = path;
    }
    if let Some(size) = cli.size {
        config.size = size;
    }

    tracing::debug!("Probe starting with config: {:?}", config);

    match cli.command {
        Command::Init => {
            let len = commands::init(&config)?;
            println!("{} {}", config.path.display(), len);
        }
        Command::Read { offset: raw } => {
            let value = commands::read(&config, offset(raw)?)?;
            println!("{value}");
        }
        Command::Cas {
            offset: raw,
            expected,
            new_value,
        } => {
            let outcome = commands::cas(&config, offset(raw)?, expected, new_value)?;
            println!(
                "previous={} swapped={}",
                outcome.previous, outcome.swapped
            );
        }
        Command::Increment { offset: raw } => {
            let value = commands::increment(&config, offset(raw)?)?;
            println!("{value}");
        }
        Command::Race {
            offset: raw,
            threads,
            rounds,
        } => {
            if let Some(threads) = threads {
                config.threads = threads;
            }
            if let Some(rounds) = rounds {
                config.rounds = rounds;
            }
            let report = commands::race(&config, offset(raw)?)?;
            println!(
                "start={} end={} successes={} retries={} writers={} elapsed_ms={}",
                report.start,
                report.end,
                report.successes,
                report.retries,
                report.distinct_writers,
                report.elapsed.as_millis()
            );
        }
        Command::ThreadId => {
            println!("{}", shmap::current_thread_id());
        }
    }

    Ok(())
}
