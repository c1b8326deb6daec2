use serde::{Deserialize, Serialize};
use crate::errors::GuardError;
use crate::models::{AssessmentSource, Severity, ThreatAssessment, ThreatReason};

/// Confidence assumed when the service omits one.
const DEFAULT_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<AnalysisContext>,
}

/// Optional page details forwarded to the classifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeResponse {
    pub threat_score: Option<f64>,
    /// Ignored: risk level is always recomputed from the score.
    #[allow(dead_code)]
    pub risk_level: Option<String>,
    pub confidence: Option<f64>,
    pub analysis: Option<Analysis>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub reasons: Vec<RawReason>,
}

/// Reasons arrive either as bare strings or as objects with loosely named fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawReason {
    Text(String),
    Structured {
        #[serde(alias = "factor")]
        message: Option<String>,
        severity: Option<String>,
        weight: Option<f64>,
        source: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.as_str(), "healthy" | "ok" | "operational")
    }
}

impl AnalyzeResponse {
    /// Convert the service payload into the canonical assessment.
    pub fn into_assessment(self, url: &str) -> Result<ThreatAssessment, GuardError> {
        let score = self
            .threat_score
            .filter(|s| s.is_finite())
            .ok_or_else(|| GuardError::RemoteInvalidResponse("missing or non-numeric threat_score".into()))?;

        let reasons = normalize_reasons(self.analysis.map(|a| a.reasons).unwrap_or_default());
        let confidence = self.confidence.unwrap_or(DEFAULT_CONFIDENCE);

        Ok(ThreatAssessment::new(
            url,
            score.round() as i64,
            reasons,
            confidence,
            AssessmentSource::Remote,
        ))
    }
}

/// Canonical reason list. Never empty.
pub fn normalize_reasons(raw: Vec<RawReason>) -> Vec<ThreatReason> {
    let mut reasons: Vec<ThreatReason> = raw
        .into_iter()
        .filter_map(|r| match r {
            RawReason::Text(text) if text.trim().is_empty() => None,
            RawReason::Text(text) => Some(ThreatReason::new(text.trim(), Severity::Medium, 0, "remote")),
            RawReason::Structured { message, severity, weight, source } => {
                let message = message.filter(|m| !m.trim().is_empty())?;
                Some(ThreatReason::new(
                    message.trim(),
                    severity.as_deref().map(Severity::parse_lenient).unwrap_or(Severity::Medium),
                    weight.filter(|w| w.is_finite()).map(|w| w.clamp(0.0, 100.0) as u8).unwrap_or(0),
                    source.as_deref().unwrap_or("remote"),
                ))
            }
        })
        .collect();

    if reasons.is_empty() {
        reasons.push(ThreatReason::new(
            "No specific threat indicators reported",
            Severity::Low,
            0,
            "remote",
        ));
    }
    reasons
}
