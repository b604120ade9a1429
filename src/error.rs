//! Error types for the sync layer

use thiserror::Error;

/// Sync layer error
///
/// Transport, protocol and application failures all collapse to the same
/// client behaviour (busy flags cleared, last confirmed record kept, one
/// notification). The variants only differ in the message shown.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Request never produced a response (connect, timeout, body read)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success status or a body that does not decode
    #[error("Protocol error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Protocol {
        status: Option<u16>,
        message: String,
    },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server answered with `success: false`
    #[error("Request rejected: {}", .message.as_deref().unwrap_or("no message"))]
    Application { message: Option<String> },

    /// Another mutation for the same record is still in flight
    #[error("A request for this record is already in flight")]
    Busy,

    /// Operation not valid from the current sub-flow state
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Application window has closed
    #[error("Editing is closed")]
    EditingClosed,

    /// Reading a selected file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    pub(crate) fn protocol(status: Option<u16>, message: impl Into<String>) -> Self {
        SyncError::Protocol {
            status,
            message: message.into(),
        }
    }

    /// Text for the user-visible notification.
    ///
    /// Only an application failure carrying a server message overrides the
    /// surface's generic text.
    pub fn notification_message(&self, generic: &str) -> String {
        match self {
            SyncError::Application {
                message: Some(message),
            } if !message.trim().is_empty() => message.clone(),
            _ => generic.to_string(),
        }
    }

    /// Server-supplied message, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            SyncError::Application { message } => message.as_deref().filter(|m| !m.is_empty()),
            _ => None,
        }
    }
}

/// Result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
