//! Asynchronous actor/learner training on top of replay tables.
//!
//! Actors and a learner run as independent threads connected only through a
//! [`ReplayTable`](ferry_core::ReplayTable) and a
//! [`VariableSource`](ferry_core::VariableSource):
//!
//! * [`Actor`] selects actions with the latest pulled parameters and feeds an
//!   [`Adder`](ferry_core::Adder).
//! * [`Learner`] consumes batches and publishes parameters.
//! * [`Builder`] wires both to the table from a
//!   [`FerryConfig`](ferry_core::FerryConfig).
//! * [`EnvironmentLoop`] runs episodes of an environment with an actor.
//! * [`ActorManager`] and [`AsyncTrainer`] run the actor threads and the
//!   learner loop, and [`train_async`] ties them together.
mod actor;
mod actor_manager;
mod async_trainer;
mod builder;
mod environment_loop;
mod learner;
mod util;
pub use actor::{actor_stats_fmt, Actor, ActorStat};
pub use actor_manager::{ActorManager, ActorManagerConfig};
pub use async_trainer::{AsyncTrainStat, AsyncTrainer, AsyncTrainerConfig};
pub use builder::Builder;
pub use environment_loop::EnvironmentLoop;
pub use learner::{Learner, LearnerConfig, TrackFn};
pub use util::train_async;
