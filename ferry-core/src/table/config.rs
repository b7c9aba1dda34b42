//! Configuration of a replay table.
use super::{RateLimiterConfig, Selector};
use crate::{FerryError, Signature};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of a [`ReplayTable`](super::ReplayTable).
///
/// # Examples
///
/// ```rust
/// use ferry_core::{RateLimiterConfig, Selector, TableConfig};
///
/// let config = TableConfig::default()
///     .name("priority_free")
///     .max_size(1_000)
///     .sampler(Selector::Uniform)
///     .remover(Selector::Fifo)
///     .rate_limiter(RateLimiterConfig::MinSize(100))
///     .seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TableConfig {
    /// Name of the table.
    pub name: String,

    /// Hard capacity.
    pub max_size: usize,

    /// Policy selecting the items returned by a sample.
    pub sampler: Selector,

    /// Policy selecting the item evicted when the table is full.
    pub remover: Selector,

    /// Admission control.
    pub rate_limiter: RateLimiterConfig,

    /// Items sampled this many times are removed. `None` keeps them until
    /// they are evicted.
    pub max_times_sampled: Option<usize>,

    /// Shapes of the items, if known.
    pub signature: Option<Signature>,

    /// Seed of the random number generator used by the selectors.
    pub seed: u64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: "replay".to_string(),
            max_size: 10_000,
            sampler: Selector::Uniform,
            remover: Selector::Fifo,
            rate_limiter: RateLimiterConfig::MinSize(1),
            max_times_sampled: None,
            signature: None,
            seed: 42,
        }
    }
}

impl TableConfig {
    /// Sets the name of the table.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the capacity.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets the sampler.
    pub fn sampler(mut self, sampler: Selector) -> Self {
        self.sampler = sampler;
        self
    }

    /// Sets the remover.
    pub fn remover(mut self, remover: Selector) -> Self {
        self.remover = remover;
        self
    }

    /// Sets the rate limiter.
    pub fn rate_limiter(mut self, rate_limiter: RateLimiterConfig) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Sets the number of samples after which an item is removed.
    pub fn max_times_sampled(mut self, max_times_sampled: Option<usize>) -> Self {
        self.max_times_sampled = max_times_sampled;
        self
    }

    /// Sets the signature.
    pub fn signature(mut self, signature: Option<Signature>) -> Self {
        self.signature = signature;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Checks the ranges of the values.
    pub fn validate(&self) -> Result<(), FerryError> {
        if self.max_size == 0 {
            return Err(FerryError::InvalidConfig("max_size must be positive".into()));
        }
        let min_size = self.rate_limiter.min_size();
        if min_size > self.max_size {
            return Err(FerryError::InvalidConfig(format!(
                "min_size ({}) exceeds max_size ({}) of table `{}`",
                min_size, self.max_size, self.name
            )));
        }
        if self.max_times_sampled == Some(0) {
            return Err(FerryError::InvalidConfig(
                "max_times_sampled must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_min_size_above_max_size() {
        let config = TableConfig::default()
            .max_size(4)
            .rate_limiter(RateLimiterConfig::MinSize(5));
        assert!(matches!(
            config.validate(),
            Err(FerryError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_serde_table_config() -> Result<()> {
        let config = TableConfig::default()
            .name("queue")
            .sampler(Selector::Fifo)
            .max_times_sampled(Some(1))
            .rate_limiter(RateLimiterConfig::SampleToInsertRatio {
                samples_per_insert: 2.0,
                min_size: 10,
                error_buffer: 4.0,
            });

        let dir = TempDir::new("table_config")?;
        let path = dir.path().join("table_config.yaml");
        config.save(&path)?;
        let config_ = TableConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }
}
