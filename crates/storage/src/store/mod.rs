#![forbid(unsafe_code)]

mod aliases;
mod bulk;
mod chunks;
mod error;
mod relationships;
mod requests;
mod schema;
mod sessions;
mod stats;
mod threads;
mod todos;
mod types;

pub use error::StoreError;
pub use requests::*;
pub use types::*;

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DB_FILE: &str = "memgate.db";

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: Option<PathBuf>,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let conn = Connection::open(storage_dir.join(DB_FILE))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::init(conn, Some(storage_dir))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, storage_dir: Option<PathBuf>) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::install(&conn)?;
        Ok(Self { conn, storage_dir })
    }

    pub fn storage_dir(&self) -> Option<&Path> {
        self.storage_dir.as_deref()
    }
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration,
        Err(_) => return 0,
    };

    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

fn encode_list(values: &[String]) -> Result<String, StoreError> {
    Ok(serde_json::to_string(values)?)
}

fn decode_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn require_non_empty(value: &str, what: &'static str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::InvalidInput(what));
    }
    Ok(())
}

fn clamp_limit(limit: usize) -> i64 {
    i64::try_from(limit.clamp(1, 1000)).unwrap_or(1000)
}
