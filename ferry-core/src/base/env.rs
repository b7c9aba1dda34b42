//! Environment.
use super::TimeStep;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Shape and name of an array emitted or consumed by an environment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArraySpec {
    /// Shape of the array. A scalar has an empty shape.
    pub shape: Vec<usize>,

    /// Name used in error messages and logs.
    pub name: String,
}

impl ArraySpec {
    /// Creates an array spec.
    pub fn new(shape: impl Into<Vec<usize>>, name: impl Into<String>) -> Self {
        Self {
            shape: shape.into(),
            name: name.into(),
        }
    }
}

/// Shapes of the observations and actions of an environment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    /// Observations.
    pub observations: ArraySpec,

    /// Actions.
    pub actions: ArraySpec,
}

/// Represents an environment, typically an MDP.
///
/// The environment is driven by an actor: [`Env::reset`] starts an episode
/// and [`Env::step`] applies an action. Both return a [`TimeStep`] carrying
/// the observation, reward, discount and whether the episode ended.
pub trait Env {
    /// Configurations.
    type Config: Clone;

    /// Observation of the environment.
    type Obs: Clone;

    /// Action of the environment.
    type Act: Clone;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Shapes of observations and actions of environments built from `config`.
    fn spec(config: &Self::Config) -> EnvironmentSpec;

    /// Starts a new episode.
    ///
    /// The returned time step is of type [`StepType::First`](super::StepType::First).
    fn reset(&mut self) -> Result<TimeStep<Self::Obs>>;

    /// Performs an environment step.
    fn step(&mut self, act: &Self::Act) -> Result<TimeStep<Self::Obs>>;
}
