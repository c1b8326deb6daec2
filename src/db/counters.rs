use crate::errors::GuardError;
use super::Database;

pub const BLOCKED_COUNT: &str = "blocked_count";

impl Database {
    pub fn increment_counter(&self, name: &str) -> Result<u64, GuardError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO counters (name, value) VALUES (?1, 1) \
             ON CONFLICT(name) DO UPDATE SET value = value + 1",
            rusqlite::params![name],
        )?;
        let value: i64 = conn.query_row(
            "SELECT value FROM counters WHERE name = ?1",
            rusqlite::params![name],
            |row| row.get(0),
        )?;
        Ok(value as u64)
    }

    pub fn counter(&self, name: &str) -> Result<u64, GuardError> {
        let conn = self.lock()?;
        match conn.query_row(
            "SELECT value FROM counters WHERE name = ?1",
            rusqlite::params![name],
            |row| row.get::<_, i64>(0),
        ) {
            Ok(v) => Ok(v as u64),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}
