//! Environment step.
use serde::{Deserialize, Serialize};

/// Position of a time step in its episode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepType {
    /// First step of an episode, emitted by `reset`.
    First,

    /// Any step that is neither first nor last.
    Mid,

    /// Last step of an episode.
    Last,
}

/// Output of an environment at one step: `(o_t, r_t, d_t)` and the step type.
///
/// `reward` and `discount` refer to the transition that produced
/// `observation`; they are ignored on the first step. A terminal step has
/// `discount == 0`, a truncated one keeps `discount == 1`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeStep<O> {
    /// Step type.
    pub step_type: StepType,

    /// Observation.
    pub observation: O,

    /// Reward.
    pub reward: f32,

    /// Discount in `[0, 1]`.
    pub discount: f32,
}

impl<O> TimeStep<O> {
    /// First step of an episode.
    pub fn first(observation: O) -> Self {
        Self {
            step_type: StepType::First,
            observation,
            reward: 0.0,
            discount: 1.0,
        }
    }

    /// Intermediate step.
    pub fn mid(observation: O, reward: f32) -> Self {
        Self {
            step_type: StepType::Mid,
            observation,
            reward,
            discount: 1.0,
        }
    }

    /// Intermediate step with an explicit discount.
    pub fn mid_with_discount(observation: O, reward: f32, discount: f32) -> Self {
        Self {
            step_type: StepType::Mid,
            observation,
            reward,
            discount,
        }
    }

    /// Last step of an episode that reached a terminal state.
    pub fn termination(observation: O, reward: f32) -> Self {
        Self {
            step_type: StepType::Last,
            observation,
            reward,
            discount: 0.0,
        }
    }

    /// Last step of an episode cut off by a time limit.
    pub fn truncation(observation: O, reward: f32) -> Self {
        Self {
            step_type: StepType::Last,
            observation,
            reward,
            discount: 1.0,
        }
    }

    #[inline]
    /// Returns `true` on the first step.
    pub fn is_first(&self) -> bool {
        self.step_type == StepType::First
    }

    #[inline]
    /// Returns `true` on the last step, terminated or truncated.
    pub fn is_last(&self) -> bool {
        self.step_type == StepType::Last
    }
}
