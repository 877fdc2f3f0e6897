use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker unreachable: {0}")]
    Connection(String),

    #[error("broker command failed: {0}")]
    Command(#[from] redis::RedisError),

    #[error("publish timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("subscription closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, BrokerError>;
