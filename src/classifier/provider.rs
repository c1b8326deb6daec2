use std::time::Duration;
use async_trait::async_trait;
use crate::errors::GuardError;
use crate::models::ThreatAssessment;
use super::types::{AnalysisContext, HealthStatus};

#[async_trait]
pub trait ThreatClassifier: Send + Sync {
    /// Score a URL. Implementations must give up once `deadline` elapses.
    async fn classify(
        &self,
        url: &str,
        context: Option<&AnalysisContext>,
        deadline: Duration,
    ) -> Result<ThreatAssessment, GuardError>;

    /// Probe the service's health endpoint.
    async fn health(&self, deadline: Duration) -> Result<HealthStatus, GuardError>;

    /// Classifier name for logging
    fn name(&self) -> &str;
}

/// Run `classify` under a hard wall-clock deadline regardless of how the
/// implementation handles its own timeouts. Expiry drops the in-flight call.
pub async fn classify_within(
    classifier: &dyn ThreatClassifier,
    url: &str,
    context: Option<&AnalysisContext>,
    deadline: Duration,
) -> Result<ThreatAssessment, GuardError> {
    match tokio::time::timeout(deadline, classifier.classify(url, context, deadline)).await {
        Ok(result) => result,
        Err(_) => Err(GuardError::RemoteTimeout(format!(
            "{} gave no answer within {}ms",
            classifier.name(),
            deadline.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssessmentSource;

    struct Sluggish;

    #[async_trait]
    impl ThreatClassifier for Sluggish {
        async fn classify(
            &self,
            url: &str,
            _context: Option<&AnalysisContext>,
            _deadline: Duration,
        ) -> Result<ThreatAssessment, GuardError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(ThreatAssessment::new(url, 1, vec![], 1.0, AssessmentSource::Remote))
        }

        async fn health(&self, _deadline: Duration) -> Result<HealthStatus, GuardError> {
            Ok(HealthStatus { status: "healthy".into() })
        }

        fn name(&self) -> &str {
            "sluggish"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_enforced() {
        let started = tokio::time::Instant::now();
        let err = classify_within(&Sluggish, "https://a.test", None, Duration::from_secs(4))
            .await
            .unwrap_err();
        assert!(matches!(err, GuardError::RemoteTimeout(_)));
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }
}
