use crate::config::ProbeConfig;
use anyhow::{Context, Result, bail, ensure};
use shmap::{AccessMode, Mapping, current_thread_id};
use std::fs::{File, OpenOptions};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Create the backing file, or grow it if it is smaller than `config.size`.
///
/// Existing contents are preserved.
pub fn init(config: &ProbeConfig) -> Result<u64> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.path)
        .with_context(|| format!("Failed to open {}", config.path.display()))?;

    let len = file.metadata()?.len();
    if len < config.size as u64 {
        file.set_len(config.size as u64)
            .context("Failed to size backing file")?;
        tracing::info!(path = %config.path.display(), from = len, to = config.size, "Resized backing file");
        return Ok(config.size as u64);
    }

    tracing::info!(path = %config.path.display(), len, "Backing file already large enough");
    Ok(len)
}

fn open(config: &ProbeConfig, mode: AccessMode) -> Result<Mapping> {
    let file = match mode {
        AccessMode::ReadOnly => File::open(&config.path),
        AccessMode::ReadWrite => OpenOptions::new().read(true).write(true).open(&config.path),
    }
    .with_context(|| format!("Failed to open {}", config.path.display()))?;

    Mapping::open(&file, mode, config.size)
        .with_context(|| format!("Failed to map {}", config.path.display()))
}

pub fn read(config: &ProbeConfig, offset: usize) -> Result<u64> {
    let mapping = open(config, AccessMode::ReadOnly)?;
    let value = mapping.read_u64(offset)?;
    mapping.close()?;
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CasOutcome {
    pub previous: u64,
    pub swapped: bool,
}

pub fn cas(config: &ProbeConfig, offset: usize, expected: u64, new_value: u64) -> Result<CasOutcome> {
    let mapping = open(config, AccessMode::ReadWrite)?;
    let previous = mapping.compare_and_swap(offset, expected, new_value)?;
    mapping.close()?;

    Ok(CasOutcome {
        previous,
        swapped: previous == expected,
    })
}

/// Advance the counter at `offset` by one.
///
/// Returns the new value and how many swaps lost to another writer.
pub fn increment_word(mapping: &Mapping, offset: usize) -> Result<(u64, u64)> {
    let mut observed = mapping.read_u64(offset)?;
    let mut retries = 0u64;

    loop {
        let next = observed
            .checked_add(1)
            .context("Counter overflowed u64")?;
        let previous = mapping.compare_and_swap(offset, observed, next)?;
        if previous == observed {
            return Ok((next, retries));
        }
        observed = previous;
        retries += 1;
        std::hint::spin_loop();
    }
}

pub fn increment(config: &ProbeConfig, offset: usize) -> Result<u64> {
    let mapping = open(config, AccessMode::ReadWrite)?;
    let (value, retries) = increment_word(&mapping, offset)?;
    tracing::debug!(offset, value, retries, "Incremented counter");
    mapping.close()?;
    Ok(value)
}

#[derive(Debug, Clone)]
pub struct RaceReport {
    pub start: u64,
    pub end: u64,
    pub successes: u64,
    pub retries: u64,
    pub distinct_writers: usize,
    pub elapsed: Duration,
}

/// Race `config.threads` threads, each performing `config.rounds` increments
/// on the word at `offset`, then check that no increment was lost.
///
/// Assumes no other process writes the word while the race runs.
pub fn race(config: &ProbeConfig, offset: usize) -> Result<RaceReport> {
    ensure!(config.threads > 0, "Race needs at least one thread");

    let mapping = Arc::new(open(config, AccessMode::ReadWrite)?);
    let start = mapping.read_u64(offset)?;
    let barrier = Arc::new(Barrier::new(config.threads));
    let began = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|_| {
            let mapping = Arc::clone(&mapping);
            let barrier = Arc::clone(&barrier);
            let rounds = config.rounds;
            thread::spawn(move || -> Result<(u64, u64, u64)> {
                let writer = current_thread_id();
                barrier.wait();

                let mut retries = 0u64;
                for _ in 0..rounds {
                    let (_, lost) = increment_word(&mapping, offset)?;
                    retries += lost;
                }
                Ok((writer, rounds, retries))
            })
        })
        .collect();

    let mut successes = 0u64;
    let mut retries = 0u64;
    let mut writers = Vec::with_capacity(handles.len());
    for handle in handles {
        let (writer, won, lost) = match handle.join() {
            Ok(result) => result?,
            Err(_) => bail!("Race thread panicked"),
        };
        writers.push(writer);
        successes += won;
        retries += lost;
    }
    let elapsed = began.elapsed();

    writers.sort_unstable();
    writers.dedup();

    let end = mapping.read_u64(offset)?;
    ensure!(
        end.wrapping_sub(start) == successes,
        "Lost updates: counter moved {} -> {} but {} swaps succeeded",
        start,
        end,
        successes
    );

    tracing::info!(
        start,
        end,
        successes,
        retries,
        threads = config.threads,
        elapsed_ms = elapsed.as_millis() as u64,
        "Race finished"
    );

    match Arc::try_unwrap(mapping) {
        Ok(mapping) => mapping.close()?,
        Err(_) => bail!("Mapping still shared after race"),
    }

    Ok(RaceReport {
        start,
        end,
        successes,
        retries,
        distinct_writers: writers.len(),
        elapsed,
    })
}
