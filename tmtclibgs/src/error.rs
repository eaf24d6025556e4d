//! Error definitions for the TMTC front-end

use thiserror::Error;

/// TMTC error types
#[derive(Error, Debug)]
pub enum TmtcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Command buffer too short for patching: {length} bytes, at least {required} required")]
    BufferTooShortForPatch { length: usize, required: usize },

    #[error("Command buffer too long for patching: {length} bytes, at most {maximum} allowed")]
    BufferTooLongForPatch { length: usize, maximum: usize },

    #[error("Unknown processor: {0}")]
    UnknownProcessor(String),

    #[error("Link error: {0}")]
    Link(String),

    #[error("Channel error: {0}")]
    Channel(String),
}

impl TmtcError {
    pub fn config(msg: impl Into<String>) -> Self {
        TmtcError::Config(msg.into())
    }

    pub fn link(msg: impl Into<String>) -> Self {
        TmtcError::Link(msg.into())
    }

    /// Errors that mean the caller handed over a malformed command. A command
    /// link stops on these; anything else costs only the one command.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TmtcError::BufferTooShortForPatch { .. } | TmtcError::BufferTooLongForPatch { .. }
        )
    }
}

/// Result type alias for TMTC operations
pub type TmtcResult<T> = Result<T, TmtcError>;
