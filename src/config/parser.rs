use std::path::Path;
use crate::errors::GuardError;
use super::types::{GuardConfig, MAX_CLASSIFIER_TIMEOUT_MS, MIN_CLASSIFIER_TIMEOUT_MS};
use super::security::validate_security_patterns;
use super::schema::CONFIG_SCHEMA;
use tracing::warn;

const MAX_CONFIG_BYTES: u64 = 1_048_576;

pub async fn parse_config(path: &Path) -> Result<GuardConfig, GuardError> {
    if !path.exists() {
        return Err(GuardError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > MAX_CONFIG_BYTES {
        return Err(GuardError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<GuardConfig, GuardError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    // An empty file is a valid, all-defaults config.
    if yaml.is_null() {
        return Ok(GuardConfig::default());
    }

    validate_security_patterns(&yaml)?;
    validate_schema(&yaml)?;

    let config: GuardConfig = serde_yaml::from_value(yaml)?;
    validate_semantics(&config)?;
    Ok(config)
}

/// Advisory only: schema violations are logged, typed parsing decides.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), GuardError> {
    let json_value = serde_json::to_value(yaml)
        .map_err(|e| GuardError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| GuardError::Config(format!("Schema compilation error: {}", e)))?;

    if let Err(errors) = compiled.validate(&json_value) {
        for e in errors {
            warn!(validation_error = %format!("{} at {}", e, e.instance_path), "Config schema warning");
        }
    }

    Ok(())
}

fn validate_semantics(config: &GuardConfig) -> Result<(), GuardError> {
    let endpoint = url::Url::parse(&config.classifier.endpoint).map_err(|e| {
        GuardError::Config(format!("Invalid classifier endpoint '{}': {}", config.classifier.endpoint, e))
    })?;
    if !matches!(endpoint.scheme(), "http" | "https") || endpoint.host_str().is_none() {
        return Err(GuardError::Config(format!(
            "Classifier endpoint must be an http(s) URL with a host: {}",
            config.classifier.endpoint
        )));
    }

    let timeout = config.classifier.timeout_ms;
    if !(MIN_CLASSIFIER_TIMEOUT_MS..=MAX_CLASSIFIER_TIMEOUT_MS).contains(&timeout) {
        warn!(
            timeout_ms = timeout,
            effective_ms = config.classifier.deadline().as_millis() as u64,
            "Classifier timeout outside 3-5s, clamping"
        );
    }

    if config.cache.capacity < 2 {
        return Err(GuardError::Config("cache.capacity must be at least 2".into()));
    }

    for host in &config.whitelist {
        if !is_bare_hostname(host) {
            return Err(GuardError::Config(format!(
                "Whitelist entries must be bare hostnames, got '{}'",
                host
            )));
        }
    }

    Ok(())
}

pub fn is_bare_hostname(host: &str) -> bool {
    !host.is_empty()
        && host.len() <= 253
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        && !host.starts_with('.')
        && !host.ends_with('.')
}
