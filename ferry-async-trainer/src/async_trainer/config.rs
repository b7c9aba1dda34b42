use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`AsyncTrainer`](crate::AsyncTrainer).
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AsyncTrainerConfig {
    /// The maximum number of learner steps.
    pub max_learner_steps: usize,

    /// Interval of flushing records in learner steps.
    pub flush_record_interval: usize,

    /// Interval of recording compute cost and table counters in learner steps.
    pub record_compute_cost_interval: usize,

    /// How long the learner waits for a batch before checking the stop flag,
    /// in milliseconds.
    pub poll_interval_ms: u64,
}

impl AsyncTrainerConfig {
    /// Constructs [`AsyncTrainerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`AsyncTrainerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }

    /// Sets the maximum number of learner steps.
    pub fn max_learner_steps(mut self, v: usize) -> Self {
        self.max_learner_steps = v;
        self
    }

    /// Sets the interval of flushing records.
    pub fn flush_record_interval(mut self, v: usize) -> Self {
        self.flush_record_interval = v;
        self
    }

    /// Sets the interval of recording compute cost.
    pub fn record_compute_cost_interval(mut self, v: usize) -> Self {
        self.record_compute_cost_interval = v;
        self
    }

    /// Sets the polling interval.
    pub fn poll_interval_ms(mut self, v: u64) -> Self {
        self.poll_interval_ms = v;
        self
    }
}

impl Default for AsyncTrainerConfig {
    fn default() -> Self {
        Self {
            max_learner_steps: 10_000,
            flush_record_interval: 1_000,
            record_compute_cost_interval: 1_000,
            poll_interval_ms: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_async_trainer_config() -> Result<()> {
        let config = AsyncTrainerConfig::default()
            .max_learner_steps(7)
            .poll_interval_ms(5);
        let dir = TempDir::new("async_trainer_config")?;
        let path = dir.path().join("async_trainer_config.yaml");
        config.save(&path)?;
        let config_ = AsyncTrainerConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }
}
