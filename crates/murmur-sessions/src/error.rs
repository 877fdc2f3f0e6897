use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("store unreachable: {0}")]
    Connection(String),

    #[error("store command failed: {0}")]
    Command(#[from] redis::RedisError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
