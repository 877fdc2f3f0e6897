use std::sync::Mutex;

use rusqlite::Connection;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, UserError};

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub user_name: String,
}

/// Thread-safe store for user records.
///
/// Wraps a single SQLite connection in a `Mutex` - queries here are cheap
/// point lookups and a Mutex is sufficient for a single Logic node.
pub struct UserStore {
    db: Mutex<Connection>,
}

impl UserStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Create a user. The password arrives pre-hashed from the front-end.
    pub fn register(&self, name: &str, password_hash: &str) -> Result<i64> {
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "INSERT OR IGNORE INTO users (user_name, password, created_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![name, password_hash, now],
        )?;
        if changed == 0 {
            return Err(UserError::NameTaken(name.to_string()));
        }
        let id = db.last_insert_rowid();
        debug!(user_id = id, name, "registered user");
        Ok(id)
    }

    /// Check credentials, returning the user on a match.
    pub fn verify(&self, name: &str, password_hash: &str) -> Result<User> {
        let db = self.db.lock().unwrap();
        let row: Option<(i64, String)> = match db.query_row(
            "SELECT id, password FROM users WHERE user_name = ?1",
            rusqlite::params![name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        ) {
            Ok(r) => Some(r),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(UserError::Database(e)),
        };
        match row {
            Some((id, stored)) if stored == password_hash => Ok(User {
                id,
                user_name: name.to_string(),
            }),
            _ => Err(UserError::BadCredentials),
        }
    }

    pub fn name_by_id(&self, user_id: i64) -> Result<Option<String>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            "SELECT user_name FROM users WHERE id = ?1",
            rusqlite::params![user_id],
            |row| row.get(0),
        ) {
            Ok(name) => Ok(Some(name)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(UserError::Database(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> UserStore {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        UserStore::new(conn)
    }

    #[test]
    fn register_then_verify() {
        let s = store();
        let id = s.register("alice", "e38ad2").unwrap();
        assert!(id > 0);

        let user = s.verify("alice", "e38ad2").unwrap();
        assert_eq!(user.id, id);
        assert_eq!(s.name_by_id(id).unwrap().as_deref(), Some("alice"));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let s = store();
        s.register("alice", "h1").unwrap();
        assert!(matches!(
            s.register("alice", "h2"),
            Err(UserError::NameTaken(_))
        ));
    }

    #[test]
    fn wrong_password_fails() {
        let s = store();
        s.register("bob", "right").unwrap();
        assert!(matches!(
            s.verify("bob", "wrong"),
            Err(UserError::BadCredentials)
        ));
        assert!(matches!(
            s.verify("nobody", "x"),
            Err(UserError::BadCredentials)
        ));
    }
}
