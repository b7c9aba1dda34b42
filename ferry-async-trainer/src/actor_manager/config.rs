use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`ActorManager`](super::ActorManager).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActorManagerConfig {
    /// Number of actor threads.
    pub n_actors: usize,

    /// Seed of the first actor. Actor `i` uses `seed + i` for both its
    /// environment and its policy.
    pub seed: u64,

    /// Pause in milliseconds before a refused insert is retried, when the
    /// adders run with [`Backpressure::Fail`](ferry_core::Backpressure::Fail).
    pub retry_interval_ms: u64,
}

impl Default for ActorManagerConfig {
    fn default() -> Self {
        Self {
            n_actors: 1,
            seed: 0,
            retry_interval_ms: 10,
        }
    }
}

impl ActorManagerConfig {
    /// Creates a configuration with `n_actors` actors.
    pub fn new(n_actors: usize) -> Self {
        Self {
            n_actors,
            ..Self::default()
        }
    }

    /// Sets the seed of the first actor.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the retry interval.
    pub fn retry_interval_ms(mut self, v: u64) -> Self {
        self.retry_interval_ms = v;
        self
    }

    /// Constructs [`ActorManagerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ActorManagerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
