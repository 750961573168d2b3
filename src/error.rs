//! Error types for the extension host.

use thiserror::Error;

/// Result type alias using our error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the extension host.
///
/// Extension-origin failures (`Load`, `Handler`, `HandlerTimeout`,
/// `CommandHandler`) are caught at the boundary nearest their origin and
/// converted into notifications; they never propagate into the agent loop.
#[derive(Error, Debug)]
pub enum Error {
    /// An extension's entry function failed during load.
    #[error("Extension load error: {extension}: {message}")]
    Load { extension: String, message: String },

    /// A subscribed event handler failed during publish.
    #[error("Handler error: {extension} ({event}): {message}")]
    Handler {
        extension: String,
        event: &'static str,
        message: String,
    },

    /// A subscribed event handler exceeded the configured timeout.
    #[error("Handler timeout: {extension} ({event}) after {timeout_ms}ms")]
    HandlerTimeout {
        extension: String,
        event: &'static str,
        timeout_ms: u64,
    },

    /// Invoke was called with a name no extension registered.
    #[error("Command not found: {name}")]
    CommandNotFound { name: String },

    /// A registered command handler failed during invoke.
    #[error("Command error: {command}: {message}")]
    CommandHandler { command: String, message: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] Box<std::io::Error>),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] Box<serde_json::Error>),
}

impl Error {
    /// Create a load error.
    pub fn load(extension: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Load {
            extension: extension.into(),
            message: message.into(),
        }
    }

    /// Create a handler error.
    pub fn handler(
        extension: impl Into<String>,
        event: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::Handler {
            extension: extension.into(),
            event,
            message: message.into(),
        }
    }

    /// Create a command-not-found error.
    pub fn command_not_found(name: impl Into<String>) -> Self {
        Self::CommandNotFound { name: name.into() }
    }

    /// Create a command handler error.
    pub fn command_handler(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandHandler {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Box::new(value))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(Box::new(value))
    }
}
