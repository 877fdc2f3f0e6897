use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user name already taken: {0}")]
    NameTaken(String),

    #[error("no such user or wrong password")]
    BadCredentials,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, UserError>;
