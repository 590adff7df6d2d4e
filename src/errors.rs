use thiserror::Error;

/// Errors that can occur while resolving or analysing linked documents.
#[derive(Error, Debug)]
pub enum VocabGraphError {
    #[error("not found: {message} (id: {id})")]
    NotFound { id: String, message: String },

    #[error("linked data error: {message}")]
    LinkedData { message: String },

    #[error("unknown type: {type_id}")]
    UnknownType { type_id: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VocabGraphError {
    pub fn not_found(id: impl Into<String>, message: impl Into<String>) -> Self {
        VocabGraphError::NotFound {
            id: id.into(),
            message: message.into(),
        }
    }

    pub fn linked_data(message: impl Into<String>) -> Self {
        VocabGraphError::LinkedData {
            message: message.into(),
        }
    }

    /// Returns `true` for the error kind that callers recover from locally.
    pub fn is_not_found(&self) -> bool {
        matches!(self, VocabGraphError::NotFound { .. })
    }
}

/// Convenience alias for results using `VocabGraphError`.
pub type Result<T> = std::result::Result<T, VocabGraphError>;
