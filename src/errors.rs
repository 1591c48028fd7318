//! Typed error hierarchy for the Cassa Vegas board service.
//!
//! Two top-level enums cover the two subsystems:
//! - `BoardError` — store, handoff, and build sequencer failures
//! - `ChatError` — chat relay failures
//!
//! Storage failures are logged and swallowed on write-behind paths; every
//! other variant surfaces to the caller with the prior state intact.

use thiserror::Error;

/// Errors from the board store, handoff protocol, and build sequencer.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Storage error: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("Spark {id} not found")]
    SparkNotFound { id: String },

    #[error("Stage {id} not found in track {track}")]
    StageNotFound { track: String, id: String },

    #[error("Agent {id} not found in roster")]
    AgentNotFound { id: String },

    #[error("Build already running for spark {spark_id}")]
    BuildAlreadyRunning { spark_id: String },

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from the chat session relay.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Message cannot be empty.")]
    EmptyMessage,

    #[error("The AI is currently unavailable. Please try again later.")]
    Unavailable(#[source] anyhow::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BoardError {
    /// Shorthand for validation refusals.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
