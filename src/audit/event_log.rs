use std::path::{Path, PathBuf};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::warn;
use crate::errors::GuardError;
use crate::models::{ThreatAssessment, ThreatReason};

/// Entry handed to the external analytics log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentEvent {
    pub url: String,
    pub score: u8,
    pub reasons: Vec<ThreatReason>,
    pub blocked: bool,
    /// Set when the user chose "proceed anyway" on a blocked page.
    #[serde(rename = "override", default, skip_serializing_if = "std::ops::Not::not")]
    pub user_override: bool,
    pub timestamp: DateTime<Utc>,
}

impl AssessmentEvent {
    pub fn from_assessment(assessment: &ThreatAssessment, blocked: bool) -> Self {
        Self {
            url: assessment.url.clone(),
            score: assessment.score(),
            reasons: assessment.reasons.clone(),
            blocked,
            user_override: false,
            timestamp: Utc::now(),
        }
    }

    pub fn user_override(assessment: &ThreatAssessment) -> Self {
        Self {
            user_override: true,
            ..Self::from_assessment(assessment, false)
        }
    }
}

/// Append-only sink for assessment events.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn append(&self, event: &AssessmentEvent) -> Result<(), GuardError>;
}

/// Append and discard any failure after logging it.
pub async fn record_event(sink: &dyn EventSink, event: &AssessmentEvent) {
    if let Err(e) = sink.append(event).await {
        warn!(url = %event.url, error = %e, "Event log append failed, dropping event");
    }
}

/// JSON-lines file, one event per line.
pub struct JsonlEventLog {
    path: PathBuf,
}

impl JsonlEventLog {
    pub async fn open(path: &Path) -> Result<Self, GuardError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(Self { path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EventSink for JsonlEventLog {
    async fn append(&self, event: &AssessmentEvent) -> Result<(), GuardError> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Sink for runs that should leave no trace on disk.
pub struct NullEventLog;

#[async_trait]
impl EventSink for NullEventLog {
    async fn append(&self, _event: &AssessmentEvent) -> Result<(), GuardError> {
        Ok(())
    }
}
