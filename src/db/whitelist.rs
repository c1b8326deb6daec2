use chrono::Utc;
use crate::errors::GuardError;
use super::Database;

impl Database {
    pub fn add_whitelist(&self, hostname: &str) -> Result<bool, GuardError> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO whitelist (hostname, added_at) VALUES (?1, ?2)",
            rusqlite::params![hostname.to_ascii_lowercase(), Utc::now().to_rfc3339()],
        )?;
        Ok(inserted > 0)
    }

    pub fn remove_whitelist(&self, hostname: &str) -> Result<bool, GuardError> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM whitelist WHERE hostname = ?1",
            rusqlite::params![hostname.to_ascii_lowercase()],
        )?;
        Ok(removed > 0)
    }

    pub fn whitelist(&self) -> Result<Vec<String>, GuardError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT hostname FROM whitelist ORDER BY hostname")
            .map_err(|e| GuardError::Database(format!("Query failed: {}", e)))?;
        let rows = stmt.query_map([], |row: &rusqlite::Row| row.get::<_, String>(0))
            .map_err(|e| GuardError::Database(format!("Query error: {}", e)))?;

        let mut hosts = Vec::new();
        for row in rows {
            hosts.push(row.map_err(|e| GuardError::Database(format!("Row error: {}", e)))?);
        }
        Ok(hosts)
    }
}
