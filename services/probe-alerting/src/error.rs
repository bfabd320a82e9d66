//! Error types for probe alerting

/// Errors that can occur while building or dispatching alerts
#[derive(Debug, thiserror::Error)]
pub enum AlertingError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Error marshalling alert fields into json: {0}")]
    Encoding(String),

    #[error("Error parsing command line ({0})")]
    CommandParse(String),

    #[error("Error starting command {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for alerting operations
pub type Result<T> = std::result::Result<T, AlertingError>;
