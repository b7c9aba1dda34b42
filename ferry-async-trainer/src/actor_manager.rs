//! Runs actors on threads.
mod base;
mod config;
pub use base::ActorManager;
pub use config::ActorManagerConfig;
