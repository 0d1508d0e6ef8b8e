//! Errors that abort a turn.
//!
//! None of these reach the chat caller: the engine logs them and answers
//! with its generic apology.

use prodops_core::{CapabilityError, StorageError, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("Memory error: {0}")]
    Memory(#[from] StorageError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
