//! Command handling on top of a unit of work.
//!
//! Handlers receive the unit of work explicitly; the [`CommandPipeline`]
//! wraps commands marked [`Command::TRANSACTIONAL`] in begin/save/commit with
//! rollback on any failure.

pub mod behavior;
pub mod command;
pub mod handler;
pub mod pipeline;

pub use behavior::{PipelineError, TransactionalBehavior};
pub use command::Command;
pub use handler::CommandHandler;
pub use pipeline::CommandPipeline;
