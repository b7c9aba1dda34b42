//! Adder.
//!
//! An [`Adder`] sits between an actor and a [`ReplayTable`](crate::ReplayTable).
//! It turns the stream of `observe_first`/`observe` calls of one actor into
//! n-step [`Transition`](crate::Transition)s and writes them to the table.
//!
//! ```text
//! observe_first(o_0)
//! observe(a_0, (o_1, r_1, d_1))
//! ...
//! observe(a_{T-1}, (o_T, r_T, d_T, last))  -> flush, trajectory closed
//! ```
mod base;
mod config;
mod ring;
pub use base::Adder;
pub use config::{AdderConfig, Backpressure};
pub(crate) use ring::Ring;
