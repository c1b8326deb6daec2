use std::time::Duration;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;
use crate::config::ClassifierConfig;
use crate::errors::GuardError;
use crate::models::ThreatAssessment;
use super::provider::ThreatClassifier;
use super::types::{AnalysisContext, AnalyzeRequest, AnalyzeResponse, HealthStatus};

pub struct RemoteClassifier {
    client: Client,
    base_url: String,
    analyze_path: String,
    health_path: String,
}

impl RemoteClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self, GuardError> {
        let client = Client::builder()
            .user_agent(concat!("phishguard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GuardError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            analyze_path: config.analyze_path.clone(),
            health_path: config.health_path.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn map_transport_error(e: reqwest::Error, deadline: Duration) -> GuardError {
    if e.is_timeout() {
        GuardError::RemoteTimeout(format!("no response within {}ms", deadline.as_millis()))
    } else if e.is_decode() || e.is_body() {
        GuardError::RemoteInvalidResponse(format!("unreadable body: {}", e))
    } else {
        GuardError::RemoteUnreachable(e.to_string())
    }
}

fn check_status(status: StatusCode) -> Result<(), GuardError> {
    if status.is_success() {
        Ok(())
    } else if status.is_server_error() {
        Err(GuardError::RemoteUnreachable(format!("service answered {}", status)))
    } else {
        Err(GuardError::RemoteInvalidResponse(format!("service answered {}", status)))
    }
}

#[async_trait]
impl ThreatClassifier for RemoteClassifier {
    async fn classify(
        &self,
        url: &str,
        context: Option<&AnalysisContext>,
        deadline: Duration,
    ) -> Result<ThreatAssessment, GuardError> {
        let body = AnalyzeRequest {
            url: url.to_string(),
            context: context.cloned(),
        };

        let resp = self.client
            .post(self.endpoint(&self.analyze_path))
            .timeout(deadline)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, deadline))?;

        check_status(resp.status())?;

        let bytes = resp.bytes().await.map_err(|e| map_transport_error(e, deadline))?;
        let parsed: AnalyzeResponse = serde_json::from_slice(&bytes)
            .map_err(|e| GuardError::RemoteInvalidResponse(format!("Parse error: {}", e)))?;

        let assessment = parsed.into_assessment(url)?;
        debug!(url, score = assessment.score(), "Remote classifier answered");
        Ok(assessment)
    }

    async fn health(&self, deadline: Duration) -> Result<HealthStatus, GuardError> {
        let resp = self.client
            .get(self.endpoint(&self.health_path))
            .timeout(deadline)
            .send()
            .await
            .map_err(|e| map_transport_error(e, deadline))?;

        check_status(resp.status())?;

        resp.json::<HealthStatus>()
            .await
            .map_err(|e| GuardError::RemoteInvalidResponse(format!("Parse error: {}", e)))
    }

    fn name(&self) -> &str {
        "remote"
    }
}
