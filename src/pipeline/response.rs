use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use crate::audit::{record_event, AssessmentEvent, EventSink};
use crate::config::ResponseConfig;
use crate::db::{Database, HistoryRecord, BLOCKED_COUNT};
use crate::errors::{GuardError, Recovery};
use crate::models::{RiskLevel, ThreatAssessment};
use super::messages::{PageCommand, WarningView};
use super::tab_state::{ActionTaken, TabState};

pub const CREDENTIAL_BLOCK_MESSAGE: &str =
    "This page looks like a phishing attempt. Submitting passwords or other credentials has been blocked.";

/// Inboxes of the page agents, one per tab.
#[derive(Default)]
pub struct PageRouter {
    inboxes: HashMap<u32, mpsc::UnboundedSender<PageCommand>>,
}

impl PageRouter {
    pub fn attach(&mut self, tab_id: u32, inbox: mpsc::UnboundedSender<PageCommand>) {
        self.inboxes.insert(tab_id, inbox);
    }

    pub fn detach(&mut self, tab_id: u32) {
        self.inboxes.remove(&tab_id);
    }

    pub fn deliver(&self, tab_id: u32, command: PageCommand) -> Result<(), GuardError> {
        let kind = command.kind();
        let inbox = self.inboxes.get(&tab_id).ok_or_else(|| {
            GuardError::MessageDeliveryFailed(format!("no page agent in tab {} for {}", tab_id, kind))
        })?;
        inbox.send(command).map_err(|_| {
            GuardError::MessageDeliveryFailed(format!("page agent in tab {} is gone ({})", tab_id, kind))
        })
    }

    /// Deliver, treating a missing or closed recipient as a no-op.
    pub fn notify(&self, tab_id: u32, command: PageCommand) {
        if let Err(e) = self.deliver(tab_id, command) {
            warn!(tab_id, error = %e, "Page message dropped");
        }
    }
}

/// What the controller did with an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Below the block threshold; status forwarded, banner shown for suspicious pages.
    Monitored { banner: bool },
    /// First crossing of the block threshold on this page-load.
    Blocked,
    /// Already blocked on this page-load; nothing to do.
    AlreadyBlocked,
    /// Over the threshold but the user chose to proceed; no redirect.
    Suppressed,
}

/// Turns a current assessment into user-visible actions.
pub struct ResponseController {
    threshold: u8,
    history_limit: usize,
    db: Database,
    events: Arc<dyn EventSink>,
}

impl ResponseController {
    pub fn new(config: &ResponseConfig, db: Database, events: Arc<dyn EventSink>) -> Self {
        Self {
            threshold: config.effective_threshold(),
            history_limit: config.history_limit,
            db,
            events,
        }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub async fn respond(
        &self,
        tab: &mut TabState,
        assessment: &ThreatAssessment,
        pages: &PageRouter,
    ) -> ResponseOutcome {
        let tab_id = tab.tab_id;

        if assessment.score() < self.threshold {
            let banner = assessment.risk_level() >= RiskLevel::Suspicious;
            pages.notify(tab_id, PageCommand::UpdateStatus { assessment: assessment.clone(), banner });
            if tab.action() != ActionTaken::Blocked {
                tab.set_action(ActionTaken::Monitored);
            }
            record_event(self.events.as_ref(), &AssessmentEvent::from_assessment(assessment, false)).await;
            debug!(tab_id, url = %assessment.url, score = assessment.score(), banner, "Page monitored");
            return ResponseOutcome::Monitored { banner };
        }

        if tab.action() == ActionTaken::Blocked {
            debug!(tab_id, url = %assessment.url, score = assessment.score(), "Already blocked");
            return ResponseOutcome::AlreadyBlocked;
        }

        pages.notify(tab_id, PageCommand::UpdateStatus { assessment: assessment.clone(), banner: true });
        pages.notify(tab_id, PageCommand::BlockCredentials { message: CREDENTIAL_BLOCK_MESSAGE.to_string() });

        if tab.is_overridden() {
            info!(tab_id, url = %assessment.url, score = assessment.score(), "Block suppressed by user override");
            record_event(self.events.as_ref(), &AssessmentEvent::from_assessment(assessment, false)).await;
            return ResponseOutcome::Suppressed;
        }

        tab.set_action(ActionTaken::Blocked);
        match self.db.increment_counter(BLOCKED_COUNT) {
            Ok(total) => debug!(total, "Blocked counter incremented"),
            Err(e) => warn!(error = %e, "Failed to increment blocked counter"),
        }
        self.append_history(&HistoryRecord::from_assessment(tab_id, assessment, true));
        record_event(self.events.as_ref(), &AssessmentEvent::from_assessment(assessment, true)).await;

        pages.notify(tab_id, PageCommand::ShowWarning(WarningView::from_assessment(assessment)));
        info!(
            tab_id,
            url = %assessment.url,
            score = assessment.score(),
            risk = %assessment.risk_level(),
            source = %assessment.source,
            "Page blocked"
        );
        ResponseOutcome::Blocked
    }

    /// Log a "proceed anyway" decision.
    pub async fn record_override(&self, assessment: &ThreatAssessment) {
        info!(url = %assessment.url, score = assessment.score(), "User proceeded past warning");
        record_event(self.events.as_ref(), &AssessmentEvent::user_override(assessment)).await;
    }

    /// Append to history. On quota exhaustion the whole history is dropped
    /// and the append is tried once more.
    fn append_history(&self, record: &HistoryRecord) {
        let err = match self.db.append_history(record, self.history_limit) {
            Ok(()) => return,
            Err(e) => e,
        };
        if err.classify().recovery != Recovery::TruncateHistory {
            warn!(error = %err, "Failed to append history");
            return;
        }

        warn!(error = %err, "History storage full, clearing");
        if let Err(e) = self.db.clear_history() {
            warn!(error = %e, "Failed to clear history");
            return;
        }
        if let Err(e) = self.db.append_history(record, self.history_limit) {
            warn!(error = %e, "History append failed after clearing, record dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::NullEventLog;
    use crate::models::AssessmentSource;

    const URL: &str = "https://bad.test/";

    fn setup() -> (ResponseController, Database, PageRouter, mpsc::UnboundedReceiver<PageCommand>) {
        let db = Database::in_memory().unwrap();
        let controller = ResponseController::new(&ResponseConfig::default(), db.clone(), Arc::new(NullEventLog));
        let (tx, rx) = mpsc::unbounded_channel();
        let mut pages = PageRouter::default();
        pages.attach(1, tx);
        (controller, db, pages, rx)
    }

    fn loaded_tab(score: i64) -> (TabState, ThreatAssessment) {
        let mut tab = TabState::new(1);
        tab.begin(URL, 1);
        let a = ThreatAssessment::new(URL, score, vec![], 0.9, AssessmentSource::Remote);
        tab.complete(1, URL, a.clone());
        (tab, a)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<PageCommand>) -> Vec<&'static str> {
        let mut kinds = Vec::new();
        while let Ok(cmd) = rx.try_recv() {
            kinds.push(cmd.kind());
        }
        kinds
    }

    #[tokio::test]
    async fn test_safe_page_only_updates_status() {
        let (controller, db, pages, mut rx) = setup();
        let (mut tab, a) = loaded_tab(10);
        let outcome = controller.respond(&mut tab, &a, &pages).await;
        assert_eq!(outcome, ResponseOutcome::Monitored { banner: false });
        assert_eq!(drain(&mut rx), vec!["updateStatus"]);
        assert_eq!(tab.action(), ActionTaken::Monitored);
        assert_eq!(db.counter(BLOCKED_COUNT).unwrap(), 0);
        assert_eq!(db.history_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_suspicious_page_gets_banner() {
        let (controller, _db, pages, mut rx) = setup();
        let (mut tab, a) = loaded_tab(59);
        let outcome = controller.respond(&mut tab, &a, &pages).await;
        assert_eq!(outcome, ResponseOutcome::Monitored { banner: true });
        match rx.try_recv().unwrap() {
            PageCommand::UpdateStatus { banner, .. } => assert!(banner),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_block_happens_once() {
        let (controller, db, pages, mut rx) = setup();
        let (mut tab, a) = loaded_tab(60);
        assert_eq!(controller.respond(&mut tab, &a, &pages).await, ResponseOutcome::Blocked);
        assert_eq!(drain(&mut rx), vec!["updateStatus", "blockCredentials", "showWarning"]);

        let higher = a.enhanced(30, vec![]);
        assert_eq!(controller.respond(&mut tab, &higher, &pages).await, ResponseOutcome::AlreadyBlocked);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(db.counter(BLOCKED_COUNT).unwrap(), 1);
        assert_eq!(db.history_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_override_suppresses_redirect() {
        let (controller, db, pages, mut rx) = setup();
        let (mut tab, a) = loaded_tab(90);
        assert!(tab.override_block(URL));
        assert_eq!(controller.respond(&mut tab, &a, &pages).await, ResponseOutcome::Suppressed);
        let kinds = drain(&mut rx);
        assert!(!kinds.contains(&"showWarning"));
        assert!(kinds.contains(&"blockCredentials"));
        assert_eq!(db.counter(BLOCKED_COUNT).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_page_agent_is_noop() {
        let db = Database::in_memory().unwrap();
        let controller = ResponseController::new(&ResponseConfig::default(), db.clone(), Arc::new(NullEventLog));
        let pages = PageRouter::default();
        let (mut tab, a) = loaded_tab(95);
        assert_eq!(controller.respond(&mut tab, &a, &pages).await, ResponseOutcome::Blocked);
        assert_eq!(db.counter(BLOCKED_COUNT).unwrap(), 1);
    }

    #[test]
    fn test_deliver_to_closed_inbox_fails() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut pages = PageRouter::default();
        pages.attach(3, tx);
        let err = pages.deliver(3, PageCommand::BlockCredentials { message: "x".into() }).unwrap_err();
        assert_eq!(err.classify().recovery, Recovery::Ignore);
    }

    #[tokio::test]
    async fn test_quota_exhaustion_clears_history() {
        let db = Database::in_memory_with_quota(24).unwrap();
        let controller = ResponseController::new(&ResponseConfig::default(), db.clone(), Arc::new(NullEventLog));
        let pages = PageRouter::default();
        let reasons: Vec<_> = (0..40)
            .map(|i| crate::models::ThreatReason::new("x".repeat(400) + &i.to_string(), crate::models::Severity::High, 1, "remote"))
            .collect();

        for i in 0..30 {
            let url = format!("https://bad{}.test/", i);
            let mut tab = TabState::new(i);
            tab.begin(&url, 1);
            let a = ThreatAssessment::new(&url, 90, reasons.clone(), 0.9, AssessmentSource::Remote);
            tab.complete(1, &url, a.clone());
            assert_eq!(controller.respond(&mut tab, &a, &pages).await, ResponseOutcome::Blocked);
        }
        let count = db.history_count().unwrap();
        assert!(count >= 1 && count < 30, "history should have been truncated, got {}", count);
    }
}
