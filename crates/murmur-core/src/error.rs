use thiserror::Error;

#[derive(Debug, Error)]
pub enum MurmurError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed")]
    AuthFailed,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Rpc error ({tier}): {reason}")]
    Rpc { tier: String, reason: String },

    #[error("Room not found: {0}")]
    RoomNotFound(i64),

    #[error("User not found: {0}")]
    UserNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request timeout after {ms}ms")]
    Timeout { ms: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MurmurError {
    /// Short code string used in log fields and RPC failure messages.
    pub fn code(&self) -> &'static str {
        match self {
            MurmurError::Config(_) => "CONFIG_ERROR",
            MurmurError::AuthFailed => "AUTH_FAILED",
            MurmurError::Store(_) => "STORE_ERROR",
            MurmurError::Broker(_) => "BROKER_ERROR",
            MurmurError::Registry(_) => "REGISTRY_ERROR",
            MurmurError::Rpc { .. } => "RPC_ERROR",
            MurmurError::RoomNotFound(_) => "ROOM_NOT_FOUND",
            MurmurError::UserNotFound(_) => "USER_NOT_FOUND",
            MurmurError::Serialization(_) => "SERIALIZATION_ERROR",
            MurmurError::Io(_) => "IO_ERROR",
            MurmurError::Timeout { .. } => "TIMEOUT",
            MurmurError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, MurmurError>;
