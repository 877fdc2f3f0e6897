use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("malformed chat payload: {0}")]
    BadPayload(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HistoryError>;
