//! Configuration of [`Adder`](super::Adder).
use crate::FerryError;
use serde::{Deserialize, Serialize};

/// What an adder does when the table refuses its items.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backpressure {
    /// Wait until the rate limiter admits the items or the table is closed.
    Block,

    /// Return [`FerryError::AdderBackpressure`] without changing any state, so
    /// the same call can be retried later.
    Fail,
}

/// Configuration of [`Adder`](super::Adder).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdderConfig {
    /// Number of environment steps per transition.
    pub n_step: usize,

    /// Discount applied between the steps of a window.
    pub discount: f32,

    /// Number of steps between the starts of consecutive windows.
    ///
    /// `None` means `n_step`: windows do not overlap and every reward lands in
    /// exactly one transition. `Some(1)` emits one transition per step.
    pub period: Option<usize>,

    /// Behaviour when the table refuses an insert.
    pub backpressure: Backpressure,
}

impl Default for AdderConfig {
    fn default() -> Self {
        Self {
            n_step: 1,
            discount: 0.99,
            period: None,
            backpressure: Backpressure::Block,
        }
    }
}

impl AdderConfig {
    /// Sets the number of steps per transition.
    pub fn n_step(mut self, n_step: usize) -> Self {
        self.n_step = n_step;
        self
    }

    /// Sets the discount.
    pub fn discount(mut self, discount: f32) -> Self {
        self.discount = discount;
        self
    }

    /// Sets the emission period.
    pub fn period(mut self, period: Option<usize>) -> Self {
        self.period = period;
        self
    }

    /// Sets the backpressure mode.
    pub fn backpressure(mut self, backpressure: Backpressure) -> Self {
        self.backpressure = backpressure;
        self
    }

    /// Effective emission period.
    pub fn effective_period(&self) -> usize {
        self.period.unwrap_or(self.n_step)
    }

    /// Largest number of items written by one call of the adder, reached
    /// when an episode ends with a full window buffered.
    pub fn max_insert_width(&self) -> usize {
        let period = self.effective_period().max(1);
        (self.n_step + period - 1) / period
    }

    /// Checks the ranges of the values.
    pub fn validate(&self) -> Result<(), FerryError> {
        if self.n_step == 0 {
            return Err(FerryError::InvalidConfig("n_step must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.discount) {
            return Err(FerryError::InvalidConfig(format!(
                "discount must be in [0, 1], got {}",
                self.discount
            )));
        }
        let period = self.effective_period();
        if period == 0 || period > self.n_step {
            return Err(FerryError::InvalidConfig(format!(
                "period must be in 1..={}, got {}",
                self.n_step, period
            )));
        }
        Ok(())
    }
}
