#![warn(missing_docs)]
//! Data-coupling layer between actors and learners in reinforcement learning.
//!
//! Actors write trajectory fragments through an [`Adder`] into a bounded
//! [`ReplayTable`]; learners read uniformly sampled [`Batch`]es through a
//! [`DatasetIterator`]. Parameters flow back from the learner to the actors
//! through a [`VariableSource`].
//!
//! ```text
//! env -> Actor -> Adder -> ReplayTable -> DatasetIterator -> Learner
//!          ^                                                   |
//!          +---------------- VariableSource <-----------------+
//! ```
//!
//! The table and the variable source are the only shared resources. Both are
//! safe to use from many threads and both can be closed, which releases every
//! caller blocked on them with [`FerryError::Cancelled`].
pub mod adder;
pub mod dataset;
pub mod dummy;
pub mod error;
pub mod record;
pub mod table;
pub mod variable;

mod base;
pub use base::{
    ArraySpec, Env, EnvironmentSpec, PolicyFn, Shaped, StepType, Tensor, TimeStep, UpdateFn,
};

mod config;
pub use config::FerryConfig;

mod encoder;
pub use encoder::{ItemEncoder, Signature, StepRecord};

mod transition;
pub use transition::{Extras, Transition};

pub use adder::{Adder, AdderConfig, Backpressure};
pub use dataset::{Batch, DatasetIterator, Prefetched};
pub use error::FerryError;
pub use table::{
    RateLimiter, RateLimiterConfig, ReplayClient, ReplayServer, ReplayTable, SampleInfo, Sampled,
    Selector, TableConfig, TableInfo,
};
pub use variable::{VariableClient, VariableSnapshot, VariableSource};
