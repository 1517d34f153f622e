//! Application layer: command handlers, query handlers, orchestration.
//!
//! A command runs the full pipeline before acking: preconditions against
//! the read store, aggregate decision, append to the log, inline
//! projection. Queries go straight to the read store.

pub mod commands;
pub mod error;
pub mod queries;
pub mod service;

pub use commands::{
    Command, CommandAck, EndFollow, PublishPost, RegisterUser, RetractPost, StartFollow,
};
pub use error::CommandError;
pub use service::App;

pub use murmur_infra::Tunables;
