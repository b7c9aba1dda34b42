//! Dataset iterator.
//!
//! The learner reads its data through a [`DatasetIterator`], a lazy and
//! unbounded sequence of [`Batch`]es drawn from one table. Reading blocks
//! until the table can serve `batch_size` samples, which throttles the
//! learner at startup until `min_size` items have been written.
mod base;
mod batch;
pub use base::{DatasetIterator, Prefetched};
pub use batch::Batch;
