pub mod db;
pub mod error;
pub mod store;

pub use error::{HistoryError, Result};
pub use store::{ChatMessage, ChatStore, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
