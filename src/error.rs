use thiserror::Error as ThisError;

/// Errors raised by the schema codec, the database manager and the command layer.
#[derive(Debug, ThisError)]
pub enum DbboxError {
    /// Malformed `name:TYPE` column spec.
    #[error("{0}")]
    Format(String),

    /// Value-count mismatch, missing table, or a bad identifier.
    #[error("{0}")]
    Validation(String),

    /// Anything SQLite reported while executing a statement.
    #[error("Error {action}: {source}")]
    Operation {
        action: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database '{0}' is not open")]
    NotOpen(String),

    /// Arguments that do not resolve to a single operation.
    #[error("{0}")]
    Usage(String),

    /// Input ended while waiting for an answer.
    #[error("interrupted")]
    Interrupted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl DbboxError {
    /// Wraps an engine error with the action that was being attempted.
    pub fn operation(action: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| DbboxError::Operation { action, source }
    }
}

pub type Result<T, E = DbboxError> = std::result::Result<T, E>;
