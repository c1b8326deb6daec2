use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "classifier": {
                "type": "object",
                "properties": {
                    "endpoint": { "type": "string", "format": "uri" },
                    "analyze_path": { "type": "string", "pattern": "^/" },
                    "health_path": { "type": "string", "pattern": "^/" },
                    "timeout_ms": { "type": "integer", "minimum": 3000, "maximum": 5000 }
                }
            },
            "cache": {
                "type": "object",
                "properties": {
                    "ttl_secs": { "type": "integer", "minimum": 1 },
                    "capacity": { "type": "integer", "minimum": 2 }
                }
            },
            "response": {
                "type": "object",
                "properties": {
                    "block_threshold": { "type": "integer", "minimum": 60, "maximum": 100 },
                    "history_limit": { "type": "integer", "minimum": 1 }
                }
            },
            "storage": {
                "type": "object",
                "properties": {
                    "database": { "type": "string" },
                    "max_pages": { "type": "integer", "minimum": 16 },
                    "event_log": { "type": "string" }
                }
            },
            "whitelist": {
                "type": "array",
                "items": { "type": "string" }
            },
            "agent": {
                "type": "object",
                "properties": {
                    "settle_delay_ms": { "type": "integer", "minimum": 0 },
                    "max_rescans": { "type": "integer", "minimum": 0 }
                }
            }
        }
    })
});
