use super::types::GuardError;

/// How the pipeline recovers from an error without surfacing it to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Score the URL with the local heuristic scorer instead.
    Fallback,
    /// Drop the stored history and carry on.
    TruncateHistory,
    /// The recipient or sink is gone; log and move on.
    Ignore,
    /// Only reachable at startup (bad configuration, unusable database).
    Fatal,
}

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub recovery: Recovery,
}

impl ErrorClassification {
    pub fn falls_back(&self) -> bool {
        self.recovery == Recovery::Fallback
    }
}

impl GuardError {
    /// Classify this error to determine how the pipeline recovers from it.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            GuardError::RemoteTimeout(_) => ErrorClassification {
                error_type: "RemoteTimeout",
                recovery: Recovery::Fallback,
            },
            GuardError::RemoteUnreachable(_) => ErrorClassification {
                error_type: "RemoteUnreachable",
                recovery: Recovery::Fallback,
            },
            GuardError::RemoteInvalidResponse(_) => ErrorClassification {
                error_type: "RemoteInvalidResponse",
                recovery: Recovery::Fallback,
            },
            GuardError::StorageQuotaExceeded(_) => ErrorClassification {
                error_type: "StorageQuotaExceeded",
                recovery: Recovery::TruncateHistory,
            },
            GuardError::MessageDeliveryFailed(_) => ErrorClassification {
                error_type: "MessageDeliveryFailed",
                recovery: Recovery::Ignore,
            },
            GuardError::Io(_) => ErrorClassification {
                error_type: "IoError",
                recovery: Recovery::Ignore,
            },
            GuardError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                recovery: Recovery::Ignore,
            },
            GuardError::Database(_) => ErrorClassification {
                error_type: "DatabaseError",
                recovery: Recovery::Ignore,
            },
            GuardError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                recovery: Recovery::Ignore,
            },
            GuardError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                recovery: Recovery::Fatal,
            },
            GuardError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                recovery: Recovery::Fatal,
            },
            GuardError::InvalidUrl(_) => ErrorClassification {
                error_type: "InvalidUrlError",
                recovery: Recovery::Fatal,
            },
        }
    }
}
