use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::errors::GuardError;
use crate::models::{ThreatAssessment, ThreatReason};
use super::Database;

/// One row of the capped audit history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub tab_id: u32,
    pub url: String,
    pub score: u8,
    pub risk_level: String,
    pub source: String,
    pub confidence: f64,
    pub reasons: Vec<ThreatReason>,
    pub blocked: bool,
    pub created_at: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn from_assessment(tab_id: u32, assessment: &ThreatAssessment, blocked: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tab_id,
            url: assessment.url.clone(),
            score: assessment.score(),
            risk_level: assessment.risk_level().to_string(),
            source: assessment.source.to_string(),
            confidence: assessment.confidence,
            reasons: assessment.reasons.clone(),
            blocked,
            created_at: Utc::now(),
        }
    }
}

impl Database {
    /// Insert a record and drop the oldest rows beyond `limit`.
    pub fn append_history(&self, record: &HistoryRecord, limit: usize) -> Result<(), GuardError> {
        let reasons_json = serde_json::to_string(&record.reasons)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO history (id, tab_id, url, score, risk_level, source, confidence, reasons_json, blocked, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                record.id,
                record.tab_id,
                record.url,
                record.score,
                record.risk_level,
                record.source,
                record.confidence,
                reasons_json,
                record.blocked,
                record.created_at.to_rfc3339(),
            ],
        )?;
        conn.execute(
            "DELETE FROM history WHERE seq NOT IN (SELECT seq FROM history ORDER BY seq DESC LIMIT ?1)",
            rusqlite::params![limit as i64],
        )?;
        Ok(())
    }

    /// Most recent records first.
    pub fn recent_history(&self, limit: usize) -> Result<Vec<HistoryRecord>, GuardError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, tab_id, url, score, risk_level, source, confidence, reasons_json, blocked, created_at \
             FROM history ORDER BY seq DESC LIMIT ?1",
        ).map_err(|e| GuardError::Database(format!("Query failed: {}", e)))?;

        let rows = stmt.query_map(rusqlite::params![limit as i64], |row: &rusqlite::Row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u8>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, f64>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, bool>(8)?,
                row.get::<_, String>(9)?,
            ))
        }).map_err(|e| GuardError::Database(format!("Query error: {}", e)))?;

        let mut records = Vec::new();
        for row in rows {
            let (id, tab_id, url, score, risk_level, source, confidence, reasons_json, blocked, created_at) =
                row.map_err(|e| GuardError::Database(format!("Row error: {}", e)))?;
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| GuardError::Database(format!("Bad timestamp: {}", e)))?;
            records.push(HistoryRecord {
                id,
                tab_id,
                url,
                score,
                risk_level,
                source,
                confidence,
                reasons: serde_json::from_str(&reasons_json)?,
                blocked,
                created_at,
            });
        }
        Ok(records)
    }

    pub fn history_count(&self) -> Result<usize, GuardError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn clear_history(&self) -> Result<(), GuardError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM history", [])?;
        Ok(())
    }
}
