use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use url::form_urlencoded;
use crate::errors::GuardError;
use crate::models::{BehaviorSignal, RiskLevel, ThreatAssessment};

/// Warning page the background swaps in for a blocked page.
pub const WARNING_PAGE: &str = "warning.html";

/// Mailbox of the background process.
#[derive(Debug)]
pub enum BackgroundMessage {
    /// The browser committed a navigation in some frame of a tab
    Navigated {
        tab_id: u32,
        url: String,
        frame_id: u32,
    },
    /// A spawned classification task finished (or fell over)
    ClassificationFinished {
        tab_id: u32,
        navigation_id: u64,
        url: String,
        outcome: Result<ThreatAssessment, GuardError>,
    },
    /// Page agent proposes extra suspicion for the page it is running in
    EnhanceScore {
        tab_id: u32,
        url: String,
        signal: BehaviorSignal,
    },
    /// Current assessment for a tab, if any
    GetStatus {
        tab_id: u32,
        reply: oneshot::Sender<Option<ThreatAssessment>>,
    },
    /// User chose "proceed anyway" on the warning page
    ProceedAnyway {
        tab_id: u32,
        url: String,
    },
    /// A page agent's inbox became reachable
    AttachPage {
        tab_id: u32,
        inbox: mpsc::UnboundedSender<PageCommand>,
    },
    /// Hostname added to the whitelist while running
    AllowHost {
        hostname: String,
    },
    TabClosed {
        tab_id: u32,
    },
    Shutdown,
}

/// Commands from the background to the page agent of one tab.
#[derive(Debug, Clone)]
pub enum PageCommand {
    /// Latest assessment; `banner` asks the page to show the inline warning
    UpdateStatus {
        assessment: ThreatAssessment,
        banner: bool,
    },
    /// Arm interception of credential submissions
    BlockCredentials {
        message: String,
    },
    /// Replace the page with the warning page
    ShowWarning(WarningView),
}

impl PageCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            PageCommand::UpdateStatus { .. } => "updateStatus",
            PageCommand::BlockCredentials { .. } => "blockCredentials",
            PageCommand::ShowWarning(_) => "showWarning",
        }
    }
}

/// Parameters rendered by the warning page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarningView {
    pub url: String,
    pub score: u8,
    pub risk_level: RiskLevel,
    pub reasons: Vec<String>,
    /// Low for offline fallback verdicts.
    pub confidence: f64,
}

impl WarningView {
    pub fn from_assessment(assessment: &ThreatAssessment) -> Self {
        Self {
            url: assessment.url.clone(),
            score: assessment.score(),
            risk_level: assessment.risk_level(),
            reasons: assessment.reasons.iter().map(|r| r.message.clone()).collect(),
            confidence: assessment.confidence,
        }
    }

    /// Location of the warning page with the view encoded in its query.
    pub fn location(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("url", &self.url)
            .append_pair("score", &self.score.to_string())
            .append_pair("risk", self.risk_level.as_str())
            .append_pair("confidence", &format!("{:.2}", self.confidence));
        for reason in &self.reasons {
            query.append_pair("reason", reason);
        }
        format!("{}?{}", WARNING_PAGE, query.finish())
    }
}
