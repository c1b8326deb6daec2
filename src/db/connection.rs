use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use crate::errors::GuardError;

/// SQLite's own default page ceiling.
const UNBOUNDED_PAGES: u32 = 1_073_741_823;

pub struct Database {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file with a page quota.
    pub fn new(path: &Path, max_pages: u32) -> Result<Self, GuardError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| GuardError::Database(format!("Failed to open database: {}", e)))?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| GuardError::Database(format!("Failed to set pragmas: {}", e)))?;

        let db = Self { conn: Arc::new(Mutex::new(conn)) };
        db.initialize(max_pages)?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self, GuardError> {
        Self::in_memory_with_quota(UNBOUNDED_PAGES)
    }

    pub fn in_memory_with_quota(max_pages: u32) -> Result<Self, GuardError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| GuardError::Database(format!("Failed to open in-memory db: {}", e)))?;
        let db = Self { conn: Arc::new(Mutex::new(conn)) };
        db.initialize(max_pages)?;
        Ok(db)
    }

    fn initialize(&self, max_pages: u32) -> Result<(), GuardError> {
        let conn = self.lock()?;
        conn.execute_batch(super::schema::CREATE_TABLES)
            .map_err(|e| GuardError::Database(format!("Failed to create tables: {}", e)))?;
        // SQLite keeps the current size if the quota is below it.
        conn.execute_batch(&format!("PRAGMA max_page_count = {};", max_pages))
            .map_err(|e| GuardError::Database(format!("Failed to set page quota: {}", e)))?;
        Ok(())
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, GuardError> {
        self.conn
            .lock()
            .map_err(|_| GuardError::Database("Connection mutex poisoned".into()))
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self { conn: self.conn.clone() }
    }
}
