#[derive(Debug, thiserror::Error)]
pub enum PracticeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PracticeError>;

impl PracticeError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        PracticeError::InvalidInput(reason.into())
    }
}
