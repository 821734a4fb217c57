use common::env_or;
use std::path::PathBuf;

/// Default backing file for the probe
pub const DEFAULT_PATH: &str = "/dev/shm/shmap_probe";

/// One page: enough for 512 words
pub const DEFAULT_SIZE: usize = 4096;

pub const DEFAULT_THREADS: usize = 4;

pub const DEFAULT_ROUNDS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub path: PathBuf,
    pub size: usize,
    pub threads: usize,
    pub rounds: u64,
}

impl ProbeConfig {
    pub fn from_env() -> Self {
        Self {
            path: PathBuf::from(env_or("SHMAP_PATH", DEFAULT_PATH.to_string())),
            size: env_or("SHMAP_SIZE", DEFAULT_SIZE),
            threads: env_or("SHMAP_THREADS", DEFAULT_THREADS),
            rounds: env_or("SHMAP_ROUNDS", DEFAULT_ROUNDS),
        }
    }
}
