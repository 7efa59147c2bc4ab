//! Key-value store operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};

/// Persistent string key-value store backing the ledger.
pub trait KeyValueStore {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read a value. `None` if the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error>;
}

impl Database {
    /// Get a value by key.
    pub fn get_value(&self, key: &str) -> DbResult<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv_store WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(Into::into)
    }

    /// Insert or replace a value.
    pub fn set_value(&self, key: &str, value: &str) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// Delete a value.
    pub fn delete_value(&self, key: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM kv_store WHERE key = ?", [key])?;
        Ok(rows_affected > 0)
    }
}

impl KeyValueStore for Database {
    type Error = DbError;

    fn get(&self, key: &str) -> DbResult<Option<String>> {
        self.get_value(key)
    }

    fn set(&self, key: &str, value: &str) -> DbResult<()> {
        self.set_value(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_missing_key() {
        let db = setup_db();
        assert_eq!(db.get_value("nope").unwrap(), None);
    }

    #[test]
    fn test_set_and_get() {
        let db = setup_db();
        db.set_value("ibne_token_info", r#"{"lastToken":3}"#).unwrap();
        assert_eq!(
            db.get_value("ibne_token_info").unwrap().as_deref(),
            Some(r#"{"lastToken":3}"#)
        );
    }

    #[test]
    fn test_set_overwrites() {
        let db = setup_db();
        db.set_value("k", "one").unwrap();
        db.set_value("k", "two").unwrap();
        assert_eq!(db.get_value("k").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn test_delete() {
        let db = setup_db();
        db.set_value("k", "v").unwrap();
        assert!(db.delete_value("k").unwrap());
        assert!(!db.delete_value("k").unwrap());
        assert_eq!(db.get_value("k").unwrap(), None);
    }

    #[test]
    fn test_trait_dispatch() {
        fn roundtrip<S: KeyValueStore>(store: &S) -> Option<String> {
            store.set("key", "value").ok()?;
            store.get("key").ok()?
        }
        assert_eq!(roundtrip(&setup_db()).as_deref(), Some("value"));
    }
}
