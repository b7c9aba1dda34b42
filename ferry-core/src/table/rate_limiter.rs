//! Admission control.
use crate::FerryError;
use serde::{Deserialize, Serialize};

/// Configuration of a [`RateLimiter`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RateLimiterConfig {
    /// Blocks sampling until the table holds `min_size` items, then lets
    /// inserts and samples proceed freely.
    MinSize(usize),

    /// Additionally keeps the number of samples per insert close to
    /// `samples_per_insert`, within `error_buffer`.
    SampleToInsertRatio {
        /// Target number of samples per inserted item.
        samples_per_insert: f64,

        /// Minimum number of items before sampling starts.
        min_size: usize,

        /// Allowed deviation, in samples, from the target ratio.
        error_buffer: f64,
    },
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::MinSize(1)
    }
}

impl RateLimiterConfig {
    /// Minimum number of items before sampling starts.
    pub fn min_size(&self) -> usize {
        match self {
            Self::MinSize(min_size) => *min_size,
            Self::SampleToInsertRatio { min_size, .. } => *min_size,
        }
    }
}

/// Gates inserts and samples of a table.
///
/// The limiter tracks the cursor `inserts * samples_per_insert - samples` and
/// only admits operations that keep it inside `[min_diff, max_diff]`. Inserts
/// are always admitted while the table is below `min_size`, and sampling is
/// never admitted below it. For [`RateLimiterConfig::MinSize`] the bounds are
/// infinite, which leaves only the `min_size` gate.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    samples_per_insert: f64,
    min_size: usize,
    min_diff: f64,
    max_diff: f64,
    inserts: u64,
    samples: u64,
}

impl RateLimiter {
    /// Builds a rate limiter, validating the configuration.
    pub fn build(config: &RateLimiterConfig) -> Result<Self, FerryError> {
        match config {
            RateLimiterConfig::MinSize(min_size) => {
                if *min_size == 0 {
                    return Err(FerryError::InvalidConfig(
                        "min_size must be at least 1".into(),
                    ));
                }
                Ok(Self {
                    samples_per_insert: 1.0,
                    min_size: *min_size,
                    min_diff: f64::NEG_INFINITY,
                    max_diff: f64::INFINITY,
                    inserts: 0,
                    samples: 0,
                })
            }
            RateLimiterConfig::SampleToInsertRatio {
                samples_per_insert,
                min_size,
                error_buffer,
            } => {
                let spi = *samples_per_insert;
                if *min_size == 0 {
                    return Err(FerryError::InvalidConfig(
                        "min_size must be at least 1".into(),
                    ));
                }
                if spi.is_nan() || spi <= 0.0 {
                    return Err(FerryError::InvalidConfig(format!(
                        "samples_per_insert must be positive, got {}",
                        spi
                    )));
                }
                // A smaller buffer could leave both sides blocked at once.
                if *error_buffer < spi.max(1.0) {
                    return Err(FerryError::InvalidConfig(format!(
                        "error_buffer must be at least max(1, samples_per_insert) = {}, got {}",
                        spi.max(1.0),
                        error_buffer
                    )));
                }
                let offset = *min_size as f64 * spi;
                Ok(Self {
                    samples_per_insert: spi,
                    min_size: *min_size,
                    min_diff: offset - error_buffer,
                    max_diff: offset + error_buffer,
                    inserts: 0,
                    samples: 0,
                })
            }
        }
    }

    /// Minimum number of items before sampling starts.
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// Checks that inserts of up to `insert_width` items and samples of up to
    /// `sample_width` items can never be refused at the same time.
    ///
    /// Both are refused together when the cursor lies above
    /// `max_diff - insert_width * samples_per_insert` and below
    /// `min_diff + sample_width`, so the bounds must be at least
    /// `insert_width * samples_per_insert + sample_width` apart.
    pub fn check_widths(&self, insert_width: usize, sample_width: usize) -> Result<(), FerryError> {
        let needed = insert_width as f64 * self.samples_per_insert + sample_width as f64;
        if self.max_diff - self.min_diff < needed {
            return Err(FerryError::InvalidConfig(format!(
                "error_buffer {} is too small for inserts of {} and samples of {} items, \
                 needs at least {}",
                (self.max_diff - self.min_diff) / 2.0,
                insert_width,
                sample_width,
                needed / 2.0
            )));
        }
        Ok(())
    }

    /// Returns `true` if `n` items can be inserted into a table of size `size`.
    pub fn can_insert(&self, size: usize, n: usize) -> bool {
        if size + n < self.min_size {
            return true;
        }
        let diff = (self.inserts + n as u64) as f64 * self.samples_per_insert - self.samples as f64;
        diff <= self.max_diff
    }

    /// Returns `true` if `n` samples can be drawn from a table of size `size`.
    pub fn can_sample(&self, size: usize, n: usize) -> bool {
        if size < self.min_size || size == 0 {
            return false;
        }
        let diff = self.inserts as f64 * self.samples_per_insert - (self.samples + n as u64) as f64;
        diff >= self.min_diff
    }

    pub(super) fn insert(&mut self, n: usize) {
        self.inserts += n as u64;
    }

    pub(super) fn sample(&mut self, n: usize) {
        self.samples += n as u64;
    }

    /// Number of inserts registered so far.
    pub fn inserts(&self) -> u64 {
        self.inserts
    }

    /// Number of samples registered so far.
    pub fn samples(&self) -> u64 {
        self.samples
    }
}
