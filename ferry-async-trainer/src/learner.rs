//! Learner.
mod base;
mod config;
pub use base::{Learner, TrackFn};
pub use config::LearnerConfig;
