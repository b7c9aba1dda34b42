//! Types and traits for recording metrics of actors and learners.
//!
//! Metrics sinks live outside this crate. A [`Recorder`] is the interface
//! through which the training loops hand [`Record`]s to them.
//!
//! ```rust
//! use ferry_core::record::{Record, RecordValue};
//!
//! let mut record = Record::empty();
//! record.insert("learner_steps", RecordValue::Scalar(10.0));
//! record.insert("table", RecordValue::String("replay".to_string()));
//! assert_eq!(record.get_scalar("learner_steps").unwrap(), 10.0);
//! ```
mod base;
mod buffered_recorder;
mod log_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use log_recorder::LogRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
