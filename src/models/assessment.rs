use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scores at or above this value arm the block action.
pub const BLOCK_THRESHOLD: u8 = 60;

const SUSPICIOUS_FROM: u8 = 30;
const DANGEROUS_FROM: u8 = 85;

/// Severity attached to a single reason, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Sort key, most severe first: Critical = 0 through Low = 3.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }

    /// Lenient parse used when normalizing remote payloads. Unknown values map to `Medium`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "low" | "info" => Severity::Low,
            _ => Severity::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Suspicious,
    Dangerous,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        if score < SUSPICIOUS_FROM {
            RiskLevel::Safe
        } else if score < BLOCK_THRESHOLD {
            RiskLevel::Suspicious
        } else if score < DANGEROUS_FROM {
            RiskLevel::Dangerous
        } else {
            RiskLevel::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Suspicious => "suspicious",
            RiskLevel::Dangerous => "dangerous",
            RiskLevel::Critical => "critical",
        }
    }

    pub fn recommendation(&self) -> Recommendation {
        match self {
            RiskLevel::Safe => Recommendation::Allow,
            RiskLevel::Suspicious => Recommendation::Warn,
            RiskLevel::Dangerous | RiskLevel::Critical => Recommendation::Block,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Allow,
    Warn,
    Block,
}

/// Where an assessment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentSource {
    Remote,
    Cache,
    Fallback,
    Enhanced,
}

impl std::fmt::Display for AssessmentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Remote => "remote",
            Self::Cache => "cache",
            Self::Fallback => "fallback",
            Self::Enhanced => "enhanced",
        };
        f.write_str(s)
    }
}

/// A single explanation contributing to a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatReason {
    pub message: String,
    pub severity: Severity,
    /// Points this reason contributed (0-100).
    pub weight: u8,
    /// Producer of the reason, e.g. "remote", "heuristic", "page_behavior".
    pub source: String,
}

impl ThreatReason {
    pub fn new(message: impl Into<String>, severity: Severity, weight: u8, source: &str) -> Self {
        Self {
            message: message.into(),
            severity,
            weight: weight.min(100),
            source: source.to_string(),
        }
    }
}

/// The scored verdict for one URL.
///
/// `score` and `risk_level` are private so the risk level can never drift
/// from the fixed thresholds; a new assessment is built for every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreatAssessment {
    pub url: String,
    score: u8,
    risk_level: RiskLevel,
    pub reasons: Vec<ThreatReason>,
    pub confidence: f64,
    pub source: AssessmentSource,
    pub created_at: DateTime<Utc>,
}

impl ThreatAssessment {
    pub fn new(
        url: &str,
        score: i64,
        reasons: Vec<ThreatReason>,
        confidence: f64,
        source: AssessmentSource,
    ) -> Self {
        let score = score.clamp(0, 100) as u8;
        let confidence = if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            url: url.to_string(),
            score,
            risk_level: RiskLevel::from_score(score),
            reasons,
            confidence,
            source,
            created_at: Utc::now(),
        }
    }

    /// Synthetic verdict for whitelisted hosts.
    pub fn whitelisted(url: &str) -> Self {
        Self::new(
            url,
            0,
            vec![ThreatReason::new("Host is on the user whitelist", Severity::Low, 0, "whitelist")],
            1.0,
            AssessmentSource::Cache,
        )
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    pub fn recommendation(&self) -> Recommendation {
        self.risk_level.recommendation()
    }

    pub fn is_blocking(&self) -> bool {
        self.score >= BLOCK_THRESHOLD
    }

    /// Re-label a stored assessment as served from the cache.
    pub fn as_cached(&self) -> Self {
        Self { source: AssessmentSource::Cache, ..self.clone() }
    }

    /// Fold a page-behavior delta into a new assessment.
    ///
    /// Negative deltas count as zero; the score never drops.
    pub fn enhanced(&self, delta: i32, extra: Vec<ThreatReason>) -> Self {
        let applied = delta.max(0) as i64;
        let mut reasons = self.reasons.clone();
        reasons.extend(extra);
        let mut next = Self::new(
            &self.url,
            self.score as i64 + applied,
            reasons,
            self.confidence,
            AssessmentSource::Enhanced,
        );
        next.created_at = Utc::now();
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_boundaries() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Safe);
        assert_eq!(RiskLevel::from_score(29), RiskLevel::Safe);
        assert_eq!(RiskLevel::from_score(30), RiskLevel::Suspicious);
        assert_eq!(RiskLevel::from_score(59), RiskLevel::Suspicious);
        assert_eq!(RiskLevel::from_score(60), RiskLevel::Dangerous);
        assert_eq!(RiskLevel::from_score(84), RiskLevel::Dangerous);
        assert_eq!(RiskLevel::from_score(85), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(100), RiskLevel::Critical);
    }

    #[test]
    fn test_risk_level_is_monotonic_in_score() {
        let mut previous = RiskLevel::Safe;
        for s in 0..=100u8 {
            let level = RiskLevel::from_score(s);
            assert!(level >= previous, "risk level dropped at {}", s);
            previous = level;
        }
    }

    #[test]
    fn test_score_is_clamped() {
        let high = ThreatAssessment::new("https://a.test", 250, vec![], 0.9, AssessmentSource::Remote);
        assert_eq!(high.score(), 100);
        assert_eq!(high.risk_level(), RiskLevel::Critical);

        let low = ThreatAssessment::new("https://a.test", -7, vec![], 0.9, AssessmentSource::Remote);
        assert_eq!(low.score(), 0);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let a = ThreatAssessment::new("https://a.test", 10, vec![], 1.7, AssessmentSource::Remote);
        assert_eq!(a.confidence, 1.0);
        let b = ThreatAssessment::new("https://a.test", 10, vec![], f64::NAN, AssessmentSource::Remote);
        assert_eq!(b.confidence, 0.0);
    }

    #[test]
    fn test_enhanced_never_lowers() {
        let base = ThreatAssessment::new("https://a.test", 45, vec![], 0.8, AssessmentSource::Remote);
        let lowered = base.enhanced(-20, vec![]);
        assert_eq!(lowered.score(), 45);
        let raised = base.enhanced(30, vec![]);
        assert_eq!(raised.score(), 75);
        assert_eq!(raised.source, AssessmentSource::Enhanced);
        assert_eq!(base.enhanced(90, vec![]).score(), 100);
    }

    #[test]
    fn test_recommendation_by_level() {
        assert_eq!(RiskLevel::Safe.recommendation(), Recommendation::Allow);
        assert_eq!(RiskLevel::Suspicious.recommendation(), Recommendation::Warn);
        assert_eq!(RiskLevel::Dangerous.recommendation(), Recommendation::Block);
        assert_eq!(RiskLevel::Critical.recommendation(), Recommendation::Block);
    }

    #[test]
    fn test_whitelisted_is_zero() {
        let a = ThreatAssessment::whitelisted("https://bank.example/login");
        assert_eq!(a.score(), 0);
        assert_eq!(a.risk_level(), RiskLevel::Safe);
        assert_eq!(a.source, AssessmentSource::Cache);
    }

    #[test]
    fn test_severity_lenient_parse() {
        assert_eq!(Severity::parse_lenient("CRITICAL"), Severity::Critical);
        assert_eq!(Severity::parse_lenient("info"), Severity::Low);
        assert_eq!(Severity::parse_lenient("whatever"), Severity::Medium);
    }
}
