//! Interfaces to the collaborators of the replay layer.
//!
//! The environment, the behaviour policy and the update rule are supplied by
//! the user. This module fixes the small set of traits through which the
//! actors and learners talk to them.
mod env;
mod policy;
mod shape;
mod step;
pub use env::{ArraySpec, Env, EnvironmentSpec};
pub use policy::{PolicyFn, UpdateFn};
pub use shape::{Shaped, Tensor};
pub use step::{StepType, TimeStep};
