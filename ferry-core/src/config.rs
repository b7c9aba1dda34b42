//! Configuration of a replay pipeline.
use crate::{
    AdderConfig, Backpressure, FerryError, RateLimiter, RateLimiterConfig, Selector, Signature,
    TableConfig,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Options consumed by the builder.
///
/// All values are checked by [`FerryConfig::validate`], which every builder
/// factory calls before constructing anything.
///
/// # Examples
///
/// ```rust
/// use ferry_core::FerryConfig;
///
/// let config = FerryConfig::default()
///     .max_replay_size(10)
///     .min_replay_size(4)
///     .batch_size(2)
///     .n_step(3)
///     .discount(0.99);
/// assert!(config.validate().is_ok());
/// assert!(config.clone().min_replay_size(11).validate().is_err());
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct FerryConfig {
    /// Name of the replay table.
    pub replay_table_name: String,

    /// Capacity of the replay table.
    pub max_replay_size: usize,

    /// Number of items before the learner may sample.
    pub min_replay_size: usize,

    /// Number of transitions per batch.
    pub batch_size: usize,

    /// Number of environment steps per transition.
    pub n_step: usize,

    /// Discount factor in `[0, 1]`.
    pub discount: f32,

    /// Number of learner steps between target updates.
    pub target_update_period: usize,

    /// Target number of samples per insert. `None` leaves the table gated by
    /// `min_replay_size` only.
    pub samples_per_insert: Option<f64>,

    /// Allowed deviation from `samples_per_insert`.
    pub error_buffer: f64,

    /// Sampler of the replay table.
    pub sampler: Selector,

    /// Remover of the replay table.
    pub remover: Selector,

    /// Items sampled this many times are removed.
    pub max_times_sampled: Option<usize>,

    /// Steps between the starts of consecutive n-step windows, `n_step` if
    /// `None`.
    pub adder_period: Option<usize>,

    /// Behaviour of the adders when the table refuses an insert.
    pub backpressure: Backpressure,

    /// Mixing coefficient of target updates, 1.0 for a hard copy.
    pub tau: f64,

    /// Actors refetch parameters every this many updates.
    pub variable_update_period: usize,

    /// The learner publishes parameters every this many steps.
    pub publish_period: usize,

    /// Random seed.
    pub seed: u64,
}

impl Default for FerryConfig {
    fn default() -> Self {
        Self {
            replay_table_name: "priority_table".to_string(),
            max_replay_size: 1_000_000,
            min_replay_size: 1_000,
            batch_size: 256,
            n_step: 5,
            discount: 0.99,
            target_update_period: 100,
            samples_per_insert: None,
            error_buffer: 100.0,
            sampler: Selector::Uniform,
            remover: Selector::Fifo,
            max_times_sampled: None,
            adder_period: None,
            backpressure: Backpressure::Block,
            tau: 1.0,
            variable_update_period: 1000,
            publish_period: 1,
            seed: 42,
        }
    }
}

impl FerryConfig {
    /// Sets the name of the replay table.
    pub fn replay_table_name(mut self, v: impl Into<String>) -> Self {
        self.replay_table_name = v.into();
        self
    }

    /// Sets the capacity of the replay table.
    pub fn max_replay_size(mut self, v: usize) -> Self {
        self.max_replay_size = v;
        self
    }

    /// Sets the minimum number of items before sampling.
    pub fn min_replay_size(mut self, v: usize) -> Self {
        self.min_replay_size = v;
        self
    }

    /// Sets the batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the number of steps per transition.
    pub fn n_step(mut self, v: usize) -> Self {
        self.n_step = v;
        self
    }

    /// Sets the discount factor.
    pub fn discount(mut self, v: f32) -> Self {
        self.discount = v;
        self
    }

    /// Sets the target update period.
    pub fn target_update_period(mut self, v: usize) -> Self {
        self.target_update_period = v;
        self
    }

    /// Enables the sample-to-insert ratio limiter.
    pub fn samples_per_insert(mut self, v: Option<f64>) -> Self {
        self.samples_per_insert = v;
        self
    }

    /// Sets the error buffer of the ratio limiter.
    pub fn error_buffer(mut self, v: f64) -> Self {
        self.error_buffer = v;
        self
    }

    /// Sets the sampler.
    pub fn sampler(mut self, v: Selector) -> Self {
        self.sampler = v;
        self
    }

    /// Sets the remover.
    pub fn remover(mut self, v: Selector) -> Self {
        self.remover = v;
        self
    }

    /// Sets the number of samples after which an item is removed.
    pub fn max_times_sampled(mut self, v: Option<usize>) -> Self {
        self.max_times_sampled = v;
        self
    }

    /// Sets the emission period of the adders.
    pub fn adder_period(mut self, v: Option<usize>) -> Self {
        self.adder_period = v;
        self
    }

    /// Sets the backpressure mode of the adders.
    pub fn backpressure(mut self, v: Backpressure) -> Self {
        self.backpressure = v;
        self
    }

    /// Sets the target mixing coefficient.
    pub fn tau(mut self, v: f64) -> Self {
        self.tau = v;
        self
    }

    /// Sets the refetch period of the actors.
    pub fn variable_update_period(mut self, v: usize) -> Self {
        self.variable_update_period = v;
        self
    }

    /// Sets the publication period of the learner.
    pub fn publish_period(mut self, v: usize) -> Self {
        self.publish_period = v;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Checks the ranges of all values.
    pub fn validate(&self) -> Result<(), FerryError> {
        let positive = [
            ("max_replay_size", self.max_replay_size),
            ("min_replay_size", self.min_replay_size),
            ("batch_size", self.batch_size),
            ("n_step", self.n_step),
            ("target_update_period", self.target_update_period),
            ("variable_update_period", self.variable_update_period),
            ("publish_period", self.publish_period),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(FerryError::InvalidConfig(format!("{} must be positive", name)));
            }
        }
        if !(self.tau > 0.0 && self.tau <= 1.0) {
            return Err(FerryError::InvalidConfig(format!(
                "tau must be in (0, 1], got {}",
                self.tau
            )));
        }
        let adder_config = self.adder_config();
        adder_config.validate()?;
        self.table_config(None).validate()?;
        RateLimiter::build(&self.rate_limiter_config())?
            .check_widths(adder_config.max_insert_width(), self.batch_size)?;
        Ok(())
    }

    /// Rate limiter of the replay table.
    pub fn rate_limiter_config(&self) -> RateLimiterConfig {
        match self.samples_per_insert {
            None => RateLimiterConfig::MinSize(self.min_replay_size),
            Some(samples_per_insert) => RateLimiterConfig::SampleToInsertRatio {
                samples_per_insert,
                min_size: self.min_replay_size,
                error_buffer: self.error_buffer,
            },
        }
    }

    /// Configuration of the replay table.
    pub fn table_config(&self, signature: Option<Signature>) -> TableConfig {
        TableConfig::default()
            .name(self.replay_table_name.clone())
            .max_size(self.max_replay_size)
            .sampler(self.sampler)
            .remover(self.remover)
            .rate_limiter(self.rate_limiter_config())
            .max_times_sampled(self.max_times_sampled)
            .signature(signature)
            .seed(self.seed)
    }

    /// Configuration of the adders.
    pub fn adder_config(&self) -> AdderConfig {
        AdderConfig::default()
            .n_step(self.n_step)
            .discount(self.discount)
            .period(self.adder_period)
            .backpressure(self.backpressure)
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
    fn test_validate_ranges() {
        let ok = FerryConfig::default();
        assert!(ok.validate().is_ok());

        let bad = [
            ok.clone().min_replay_size(ok.max_replay_size + 1),
            ok.clone().batch_size(0),
            ok.clone().n_step(0),
            ok.clone().discount(1.5),
            ok.clone().tau(0.0),
            ok.clone().adder_period(Some(6)),
            ok.clone().samples_per_insert(Some(8.0)).error_buffer(1.0),
            ok.clone().max_times_sampled(Some(0)),
            // Batches wider than the ratio limiter's window.
            ok.clone().samples_per_insert(Some(1.0)),
            ok.clone()
                .max_replay_size(100)
                .min_replay_size(10)
                .batch_size(16)
                .samples_per_insert(Some(1.0))
                .error_buffer(5.0),
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(FerryError::InvalidConfig(_))),
                "{:?}",
                config
            );
        }
    }

    #[test]
    fn test_ratio_limiter_fits_batches() {
        // Flushes of up to 2 items, batches of 16: the window must be 18 wide.
        let config = FerryConfig::default()
            .max_replay_size(100)
            .min_replay_size(10)
            .batch_size(16)
            .n_step(2)
            .adder_period(Some(1))
            .samples_per_insert(Some(1.0));
        assert!(config.clone().error_buffer(9.0).validate().is_ok());
        assert!(config.error_buffer(8.5).validate().is_err());
    }

    #[test]
    fn test_serde_ferry_config() -> Result<()> {
        let config = FerryConfig::default()
            .replay_table_name("replay")
            .samples_per_insert(Some(2.0))
            .adder_period(Some(1))
            .backpressure(Backpressure::Fail)
            .tau(0.005);
        let dir = TempDir::new("ferry_config")?;
        let path = dir.path().join("ferry_config.yaml");
        config.save(&path)?;
        let config_ = FerryConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }

    #[test]
    fn test_derived_configs() {
        let config = FerryConfig::default().n_step(3).min_replay_size(7);
        assert_eq!(config.adder_config().effective_period(), 3);
        let table = config.table_config(None);
        assert_eq!(table.rate_limiter, RateLimiterConfig::MinSize(7));
        assert_eq!(table.name, "priority_table");
    }
}
