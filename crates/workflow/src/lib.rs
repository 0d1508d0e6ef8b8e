//! Turn orchestration for ProdOps.
//!
//! A turn takes one user message through the safety filter, intent
//! classification, one domain handler (production, downtime, ticket or
//! knowledge), the response formatter, and finally the memory write.
//! See [`engine`] for the stage graph.

pub mod engine;
pub mod error;
pub mod extract;
pub mod intent;
pub mod prompts;
pub mod stages;
pub mod state;

pub use engine::{Capabilities, GENERIC_FAILURE_REPLY, Stage, WorkflowEngine, route};
pub use error::WorkflowError;
pub use intent::Intent;
pub use stages::{BLOCKED_REPLY, CAPABILITIES_REPLY, FOUND_REPLY, NOT_AUTHORIZED_REPLY};
pub use state::{MAX_MESSAGE_CHARS, ToolResult, TurnState};
