use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use crate::models::BLOCK_THRESHOLD;

pub const MIN_CLASSIFIER_TIMEOUT_MS: u64 = 3_000;
pub const MAX_CLASSIFIER_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GuardConfig {
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub response: ResponseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub agent: AgentConfig,
}

impl GuardConfig {
    /// Host of the classifier service. Navigations to it are never analyzed.
    pub fn classifier_host(&self) -> Option<String> {
        url::Url::parse(&self.classifier.endpoint)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub endpoint: String,
    pub analyze_path: String,
    pub health_path: String,
    pub timeout_ms: u64,
}

impl ClassifierConfig {
    /// Wall-clock deadline for one classifier call, clamped to 3-5s.
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.clamp(MIN_CLASSIFIER_TIMEOUT_MS, MAX_CLASSIFIER_TIMEOUT_MS))
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000".to_string(),
            analyze_path: "/analyze".to_string(),
            health_path: "/health".to_string(),
            timeout_ms: 4_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub capacity: usize,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300, capacity: 1_000 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResponseConfig {
    pub block_threshold: u8,
    pub history_limit: usize,
}

impl ResponseConfig {
    /// Configured threshold, never below the fixed block threshold.
    pub fn effective_threshold(&self) -> u8 {
        self.block_threshold.clamp(BLOCK_THRESHOLD, 100)
    }
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self { block_threshold: BLOCK_THRESHOLD, history_limit: 100 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database: PathBuf,
    /// SQLite page quota. Inserts beyond it fail with a quota error.
    pub max_pages: u32,
    pub event_log: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("./data/phishguard.db"),
            max_pages: 2_048,
            event_log: PathBuf::from("./data/events.jsonl"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    pub settle_delay_ms: u64,
    pub max_rescans: u32,
}

impl AgentConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { settle_delay_ms: 1_000, max_rescans: 50 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_config_default() {
        let config = GuardConfig::default();
        assert_eq!(config.classifier.endpoint, "http://localhost:8000");
        assert_eq!(config.cache.ttl(), Duration::from_secs(300));
        assert_eq!(config.response.effective_threshold(), 60);
        assert!(config.whitelist.is_empty());
    }

    #[test]
    fn test_deadline_clamped() {
        let mut c = ClassifierConfig::default();
        c.timeout_ms = 500;
        assert_eq!(c.deadline(), Duration::from_secs(3));
        c.timeout_ms = 60_000;
        assert_eq!(c.deadline(), Duration::from_secs(5));
        c.timeout_ms = 4_200;
        assert_eq!(c.deadline(), Duration::from_millis(4_200));
    }

    #[test]
    fn test_threshold_cannot_be_lowered() {
        let r = ResponseConfig { block_threshold: 20, history_limit: 10 };
        assert_eq!(r.effective_threshold(), 60);
        let r = ResponseConfig { block_threshold: 75, history_limit: 10 };
        assert_eq!(r.effective_threshold(), 75);
    }

    #[test]
    fn test_classifier_host() {
        let mut config = GuardConfig::default();
        config.classifier.endpoint = "https://API.PhishGuard.example:8443".to_string();
        assert_eq!(config.classifier_host().as_deref(), Some("api.phishguard.example"));
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: GuardConfig = serde_yaml::from_str("cache:\n  capacity: 10\n").unwrap();
        assert_eq!(config.cache.capacity, 10);
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.agent.max_rescans, 50);
    }
}
