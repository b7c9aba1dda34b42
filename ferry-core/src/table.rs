//! Replay table.
//!
//! A [`ReplayTable`] is a named, capacity-bounded collection of items shared
//! between the adders of many actors and the dataset iterators of the
//! learners. It owns three policies:
//!
//! * a sampler [`Selector`] deciding which item a read returns,
//! * a remover [`Selector`] deciding which item is evicted on overflow,
//! * a [`RateLimiter`] gating inserts and samples.
//!
//! Every operation runs inside a single per-table critical section, so the
//! size of a table never exceeds its `max_size`, even transiently. Independent
//! tables share nothing.
//!
//! ```rust
//! use ferry_core::{ReplayTable, TableConfig, RateLimiterConfig, FerryError};
//!
//! let config = TableConfig::default()
//!     .name("replay")
//!     .max_size(3)
//!     .rate_limiter(RateLimiterConfig::MinSize(2));
//! let table = ReplayTable::build(&config).unwrap();
//!
//! table.insert(0).unwrap();
//! assert!(matches!(table.sample(1), Err(FerryError::InsufficientData { .. })));
//!
//! table.insert(1).unwrap();
//! let items = table.sample(4).unwrap();
//! assert_eq!(items.len(), 4);
//! ```
mod base;
mod config;
mod rate_limiter;
mod selector;
mod server;
pub use base::{ReplayTable, SampleInfo, Sampled, TableInfo};
pub use config::TableConfig;
pub use rate_limiter::{RateLimiter, RateLimiterConfig};
pub use selector::Selector;
pub use server::{ReplayClient, ReplayServer};
