pub mod repository;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::Clock;

#[cfg(test)]
pub use repository::MemoryRepository;
pub use repository::{Repository, StaleAfter};

pub const AUTH_STORAGE_KEY: &str = "auth-storage";
pub const UPLOAD_STORAGE_KEY: &str = "upload-store";
pub const IMAGE_STORAGE_KEY: &str = "image-storage";
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Keys removed together on logout and expiry.
pub const SESSION_KEYS: [&str; 3] = [AUTH_STORAGE_KEY, UPLOAD_STORAGE_KEY, IMAGE_STORAGE_KEY];

/// Age after which a stored entry reads as absent.
pub fn staleness_cutoff() -> Duration {
    Duration::hours(1)
}

/// Lifetime of the `access_token` cookie.
pub fn cookie_lifetime() -> Duration {
    Duration::days(7)
}

/// SQLite-backed client storage: a key/value table of JSON entries stamped
/// with their write time, plus a cookie table with explicit expiry.
/// All operations are synchronous (rusqlite is blocking) and short.
pub struct ClientStorage {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

impl ClientStorage {
    /// Open or create the storage database at the given path.
    pub fn open(db_path: &Path, clock: Arc<dyn Clock>) -> Result<Self, String> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create data dir: {}", e))?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| format!("Failed to open client storage at {:?}: {}", db_path, e))?;
        let storage = Self::with_connection(conn, clock)?;
        info!("Opened client storage at {:?}", db_path);
        Ok(storage)
    }

    /// Storage that lives only as long as the process.
    pub fn open_in_memory(clock: Arc<dyn Clock>) -> Result<Self, String> {
        let conn = Connection::open_in_memory()
            .map_err(|e| format!("Failed to open in-memory storage: {}", e))?;
        Self::with_connection(conn, clock)
    }

    fn with_connection(conn: Connection, clock: Arc<dyn Clock>) -> Result<Self, String> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS client_storage (
                key TEXT PRIMARY KEY,
                value_json TEXT NOT NULL,
                stored_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS cookies (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );",
        )
        .map_err(|e| format!("Failed to create storage tables: {}", e))?;

        Ok(Self {
            conn: Mutex::new(conn),
            clock,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, String> {
        self.conn
            .lock()
            .map_err(|_| "Client storage lock poisoned".to_string())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Read an entry. Entries older than `max_age` are removed and read as
    /// absent; the age is measured from the last write, not the last read.
    pub fn get_item(&self, key: &str, max_age: Duration) -> Result<Option<Value>, String> {
        let conn = self.conn()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT value_json, stored_at FROM client_storage WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| format!("Storage lookup failed for '{}': {}", key, e))?;

        let Some((json, stored_at)) = row else {
            return Ok(None);
        };

        let stored_at = match DateTime::parse_from_rfc3339(&stored_at) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(e) => {
                warn!("Discarding '{}' with unreadable timestamp: {}", key, e);
                conn.execute("DELETE FROM client_storage WHERE key = ?1", params![key])
                    .map_err(|e| format!("Failed to remove '{}': {}", key, e))?;
                return Ok(None);
            }
        };

        if self.clock.now() - stored_at > max_age {
            debug!("Entry '{}' is stale (stored {}), removing", key, stored_at);
            conn.execute("DELETE FROM client_storage WHERE key = ?1", params![key])
                .map_err(|e| format!("Failed to remove stale '{}': {}", key, e))?;
            return Ok(None);
        }

        match serde_json::from_str(&json) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Ignoring unparseable entry '{}': {}", key, e);
                Ok(None)
            }
        }
    }

    /// Write an entry, stamping it with the current time.
    pub fn set_item(&self, key: &str, value: &Value) -> Result<(), String> {
        let json = serde_json::to_string(value)
            .map_err(|e| format!("Failed to serialize '{}': {}", key, e))?;
        let now = self.clock.now().to_rfc3339();
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO client_storage (key, value_json, stored_at)
                 VALUES (?1, ?2, ?3)",
                params![key, json, now],
            )
            .map_err(|e| format!("Failed to store '{}': {}", key, e))?;
        Ok(())
    }

    pub fn remove_item(&self, key: &str) -> Result<(), String> {
        self.conn()?
            .execute("DELETE FROM client_storage WHERE key = ?1", params![key])
            .map_err(|e| format!("Failed to remove '{}': {}", key, e))?;
        Ok(())
    }

    /// Remove the auth, upload and image entries together.
    pub fn clear_session_keys(&self) -> Result<(), String> {
        for key in SESSION_KEYS {
            self.remove_item(key)?;
        }
        info!("Cleared session storage keys");
        Ok(())
    }

    pub fn set_cookie(&self, name: &str, value: &str, ttl: Duration) -> Result<(), String> {
        let expires = self.clock.now() + ttl;
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO cookies (name, value, expires_at) VALUES (?1, ?2, ?3)",
                params![name, value, expires.to_rfc3339()],
            )
            .map_err(|e| format!("Failed to set cookie '{}': {}", name, e))?;
        Ok(())
    }

    /// Cookie value, or None once past its expiry.
    pub fn get_cookie(&self, name: &str) -> Result<Option<String>, String> {
        let row: Option<(String, String)> = self
            .conn()?
            .query_row(
                "SELECT value, expires_at FROM cookies WHERE name = ?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| format!("Cookie lookup failed for '{}': {}", name, e))?;

        let Some((value, expires_at)) = row else {
            return Ok(None);
        };

        let expired = DateTime::parse_from_rfc3339(&expires_at)
            .map(|ts| ts.with_timezone(&Utc) <= self.clock.now())
            .unwrap_or(true);
        if expired {
            self.remove_cookie(name)?;
            return Ok(None);
        }
        Ok(Some(value))
    }

    pub fn remove_cookie(&self, name: &str) -> Result<(), String> {
        self.conn()?
            .execute("DELETE FROM cookies WHERE name = ?1", params![name])
            .map_err(|e| format!("Failed to remove cookie '{}': {}", name, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;
    use tempfile::TempDir;

    fn storage_with_clock() -> (ClientStorage, Arc<ManualClock>, TempDir) {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let storage = ClientStorage::open(&dir.path().join("client.db"), clock.clone()).unwrap();
        (storage, clock, dir)
    }

    #[test]
    fn test_item_round_trip_within_an_hour() {
        let (storage, clock, _dir) = storage_with_clock();
        let value = json!({"token": "tok123", "sessionId": "s1"});
        storage.set_item(AUTH_STORAGE_KEY, &value).unwrap();

        clock.advance(Duration::minutes(59));
        let read = storage.get_item(AUTH_STORAGE_KEY, staleness_cutoff()).unwrap();
        assert_eq!(read, Some(value));
    }

    #[test]
    fn test_item_absent_after_an_hour() {
        let (storage, clock, _dir) = storage_with_clock();
        storage.set_item(AUTH_STORAGE_KEY, &json!({"token": "t"})).unwrap();

        clock.advance(Duration::minutes(61));
        assert_eq!(storage.get_item(AUTH_STORAGE_KEY, staleness_cutoff()).unwrap(), None);

        // The stale row is gone, so rewinding the clock does not resurrect it
        clock.advance(Duration::minutes(-61));
        assert_eq!(storage.get_item(AUTH_STORAGE_KEY, staleness_cutoff()).unwrap(), None);
    }

    #[test]
    fn test_reads_do_not_extend_age() {
        let (storage, clock, _dir) = storage_with_clock();
        storage.set_item(UPLOAD_STORAGE_KEY, &json!(1)).unwrap();

        for _ in 0..5 {
            clock.advance(Duration::minutes(15));
            let _ = storage.get_item(UPLOAD_STORAGE_KEY, staleness_cutoff()).unwrap();
        }
        // 75 minutes after the write, even though it was read every 15
        assert!(storage.get_item(UPLOAD_STORAGE_KEY, staleness_cutoff()).unwrap().is_none());
    }

    #[test]
    fn test_clear_session_keys_removes_all_three() {
        let (storage, _clock, _dir) = storage_with_clock();
        for key in SESSION_KEYS {
            storage.set_item(key, &json!({"k": key})).unwrap();
        }
        storage.set_item("unrelated", &json!(true)).unwrap();

        storage.clear_session_keys().unwrap();

        for key in SESSION_KEYS {
            assert!(storage.get_item(key, staleness_cutoff()).unwrap().is_none());
        }
        assert!(storage.get_item("unrelated", staleness_cutoff()).unwrap().is_some());
    }

    #[test]
    fn test_cookie_expires_after_ttl() {
        let (storage, clock, _dir) = storage_with_clock();
        storage
            .set_cookie(ACCESS_TOKEN_COOKIE, "tok123", cookie_lifetime())
            .unwrap();

        clock.advance(Duration::days(6));
        assert_eq!(
            storage.get_cookie(ACCESS_TOKEN_COOKIE).unwrap().as_deref(),
            Some("tok123")
        );

        clock.advance(Duration::days(2));
        assert_eq!(storage.get_cookie(ACCESS_TOKEN_COOKIE).unwrap(), None);
    }

    #[test]
    fn test_storage_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let path = dir.path().join("client.db");
        {
            let storage = ClientStorage::open(&path, clock.clone()).unwrap();
            storage.set_item(AUTH_STORAGE_KEY, &json!({"email": "a@b.com"})).unwrap();
        }
        let storage = ClientStorage::open(&path, clock).unwrap();
        let read = storage.get_item(AUTH_STORAGE_KEY, staleness_cutoff()).unwrap();
        assert_eq!(read, Some(json!({"email": "a@b.com"})));
    }
}
