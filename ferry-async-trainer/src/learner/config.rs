use anyhow::Result;
use ferry_core::{FerryConfig, FerryError};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Learner`](crate::Learner).
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LearnerConfig {
    /// Number of steps between target updates.
    pub target_update_period: usize,

    /// Mixing coefficient of target updates. With 1.0 the target is
    /// overwritten by the online parameters.
    pub tau: f64,

    /// Number of steps between publications of the parameters.
    pub publish_period: usize,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            target_update_period: 100,
            tau: 1.0,
            publish_period: 1,
        }
    }
}

impl From<&FerryConfig> for LearnerConfig {
    fn from(config: &FerryConfig) -> Self {
        Self {
            target_update_period: config.target_update_period,
            tau: config.tau,
            publish_period: config.publish_period,
        }
    }
}

impl LearnerConfig {
    /// Sets the target update period.
    pub fn target_update_period(mut self, v: usize) -> Self {
        self.target_update_period = v;
        self
    }

    /// Sets the mixing coefficient of target updates.
    pub fn tau(mut self, v: f64) -> Self {
        self.tau = v;
        self
    }

    /// Sets the publication period.
    pub fn publish_period(mut self, v: usize) -> Self {
        self.publish_period = v;
        self
    }

    /// Checks the ranges of the values.
    pub fn validate(&self) -> Result<(), FerryError> {
        if self.target_update_period == 0 || self.publish_period == 0 {
            return Err(FerryError::InvalidConfig(
                "target_update_period and publish_period must be positive".into(),
            ));
        }
        if !(self.tau > 0.0 && self.tau <= 1.0) {
            return Err(FerryError::InvalidConfig(format!(
                "tau must be in (0, 1], got {}",
                self.tau
            )));
        }
        Ok(())
    }

    /// Constructs [`LearnerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`LearnerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
