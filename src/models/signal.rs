use serde::{Deserialize, Serialize};
use super::assessment::{Severity, ThreatReason};

/// Kind of in-page behavior that raised suspicion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    CrossOriginAction,
    PlaintextSubmission,
    TlsDowngrade,
    ExcessiveHiddenFields,
    RedirectParameter,
    DynamicCodeHandler,
    PasswordInUrl,
    NewWindowTarget,
    CrossOriginScript,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorFlag {
    pub kind: FlagKind,
    pub severity: Severity,
    pub message: String,
}

/// Suspicion proposed by the page agent. Folded into an assessment, never stored on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorSignal {
    /// The agent only produces non-negative deltas; the merge treats anything below zero as zero.
    pub suspicion_delta: i32,
    pub flags: Vec<BehaviorFlag>,
}

impl BehaviorSignal {
    pub fn is_empty(&self) -> bool {
        self.suspicion_delta <= 0 && self.flags.is_empty()
    }

    /// Flags rendered as reasons for the merged assessment. Weights are not
    /// attributed per flag, so each reason carries weight 0.
    pub fn to_reasons(&self) -> Vec<ThreatReason> {
        self.flags
            .iter()
            .map(|f| ThreatReason::new(f.message.clone(), f.severity, 0, "page_behavior"))
            .collect()
    }
}
