use crate::errors::GuardError;

/// Config strings that would let a config file smuggle markup or a
/// non-network scheme into the classifier endpoint or the whitelist.
const FORBIDDEN_FRAGMENTS: &[&str] = &[
    "<script",
    "javascript:",
    "data:",
    "file:",
    "vbscript:",
    "chrome-extension:",
    "moz-extension:",
];

pub fn validate_security_patterns(value: &serde_yaml::Value) -> Result<(), GuardError> {
    check_value(value, &[])
}

fn check_value(value: &serde_yaml::Value, path: &[String]) -> Result<(), GuardError> {
    match value {
        serde_yaml::Value::String(s) => {
            let lower = s.to_lowercase();
            if let Some(fragment) = FORBIDDEN_FRAGMENTS.iter().find(|f| lower.contains(*f)) {
                let path_str = if path.is_empty() { "root".to_string() } else { path.join(".") };
                return Err(GuardError::Config(format!(
                    "Forbidden pattern '{}' found at config path: {}",
                    fragment, path_str
                )));
            }
            Ok(())
        }
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let mut next = path.to_vec();
                next.push(k.as_str().unwrap_or("unknown").to_string());
                check_value(v, &next)?;
            }
            Ok(())
        }
        serde_yaml::Value::Sequence(seq) => {
            for (i, v) in seq.iter().enumerate() {
                let mut next = path.to_vec();
                next.push(format!("[{}]", i));
                check_value(v, &next)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
