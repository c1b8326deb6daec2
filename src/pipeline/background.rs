use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use crate::audit::EventSink;
use crate::classifier::ThreatClassifier;
use crate::config::GuardConfig;
use crate::db::Database;
use crate::errors::GuardError;
use crate::models::{BehaviorSignal, ThreatAssessment};
use crate::navigation::{NavigationFilter, TOP_LEVEL_FRAME};
use super::engine::{AssessmentEngine, Lookup};
use super::messages::{BackgroundMessage, PageCommand};
use super::response::{PageRouter, ResponseController};
use super::tab_state::{Completion, Enhancement, TabState};

/// Everything the background process owns. Only the actor task touches it.
pub struct BackgroundContext {
    filter: NavigationFilter,
    engine: AssessmentEngine,
    response: ResponseController,
    tabs: HashMap<u32, TabState>,
    pages: PageRouter,
    /// In-flight classification per tab, cancelled when superseded.
    inflight: HashMap<u32, CancellationToken>,
    shutdown: CancellationToken,
    next_navigation_id: u64,
    sweep_every: Duration,
}

impl BackgroundContext {
    /// `classifier: None` runs offline (fallback scorer only). Persisted
    /// whitelist entries are merged with the configured ones.
    pub fn new(
        config: &GuardConfig,
        classifier: Option<Arc<dyn ThreatClassifier>>,
        db: Database,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, GuardError> {
        let mut engine = AssessmentEngine::new(config, classifier);
        for host in db.whitelist()? {
            engine.allow_host(&host);
        }

        Ok(Self {
            filter: NavigationFilter::new(config.classifier_host()),
            engine,
            response: ResponseController::new(&config.response, db, events),
            tabs: HashMap::new(),
            pages: PageRouter::default(),
            inflight: HashMap::new(),
            shutdown: CancellationToken::new(),
            next_navigation_id: 0,
            sweep_every: config.cache.ttl().max(Duration::from_secs(1)),
        })
    }

    /// Drain the mailbox until `Shutdown` or until every handle is dropped.
    pub async fn run(
        mut self,
        mailbox: mpsc::WeakUnboundedSender<BackgroundMessage>,
        mut rx: mpsc::UnboundedReceiver<BackgroundMessage>,
    ) {
        info!(threshold = self.response.threshold(), "Background started");
        let mut sweep = tokio::time::interval(self.sweep_every);
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        sweep.tick().await;

        loop {
            tokio::select! {
                msg = rx.recv() => match msg {
                    None | Some(BackgroundMessage::Shutdown) => break,
                    Some(msg) => self.handle(msg, &mailbox).await,
                },
                _ = sweep.tick() => {
                    let purged = self.engine.purge_expired();
                    if purged > 0 {
                        debug!(purged, "Expired cache entries dropped");
                    }
                }
            }
        }

        self.shutdown.cancel();
        let stats = self.engine.cache_stats();
        info!(
            tabs = self.tabs.len(),
            cache_hits = stats.hits,
            cache_misses = stats.misses,
            "Background stopped"
        );
    }

    async fn handle(&mut self, msg: BackgroundMessage, mailbox: &mpsc::WeakUnboundedSender<BackgroundMessage>) {
        match msg {
            BackgroundMessage::Navigated { tab_id, url, frame_id } => {
                self.on_navigated(tab_id, &url, frame_id, mailbox).await;
            }
            BackgroundMessage::ClassificationFinished { tab_id, navigation_id, url, outcome } => {
                self.on_classified(tab_id, navigation_id, &url, outcome).await;
            }
            BackgroundMessage::EnhanceScore { tab_id, url, signal } => {
                self.on_enhance(tab_id, &url, signal).await;
            }
            BackgroundMessage::GetStatus { tab_id, reply } => {
                let current = self.tabs.get(&tab_id).and_then(|t| t.current().cloned());
                if reply.send(current).is_err() {
                    debug!(tab_id, "Status requester went away");
                }
            }
            BackgroundMessage::ProceedAnyway { tab_id, url } => {
                self.on_proceed(tab_id, &url).await;
            }
            BackgroundMessage::AttachPage { tab_id, inbox } => {
                self.pages.attach(tab_id, inbox);
            }
            BackgroundMessage::AllowHost { hostname } => {
                if self.engine.allow_host(&hostname) {
                    info!(hostname = %hostname, "Host whitelisted");
                }
            }
            BackgroundMessage::TabClosed { tab_id } => {
                self.cancel_inflight(tab_id);
                self.tabs.remove(&tab_id);
                self.pages.detach(tab_id);
                debug!(tab_id, "Tab closed");
            }
            BackgroundMessage::Shutdown => {}
        }
    }

    async fn on_navigated(
        &mut self,
        tab_id: u32,
        url: &str,
        frame_id: u32,
        mailbox: &mpsc::WeakUnboundedSender<BackgroundMessage>,
    ) {
        if frame_id != TOP_LEVEL_FRAME {
            return;
        }
        self.cancel_inflight(tab_id);
        let tab = self.tabs.entry(tab_id).or_insert_with(|| TabState::new(tab_id));

        if !self.filter.admit(url, frame_id) {
            debug!(tab_id, url, "Navigation not analyzed");
            tab.reset();
            return;
        }

        self.next_navigation_id += 1;
        let navigation_id = self.next_navigation_id;
        tab.begin(url, navigation_id);
        debug!(tab_id, navigation_id, url, "Assessing");

        match self.engine.lookup(url) {
            Lookup::Ready(assessment) => {
                self.apply_initial(tab_id, navigation_id, url, assessment).await;
            }
            Lookup::Remote(call) => {
                let token = self.shutdown.child_token();
                self.inflight.insert(tab_id, token.clone());
                let mailbox = mailbox.clone();
                let url = url.to_string();
                tokio::spawn(async move {
                    let outcome = tokio::select! {
                        _ = token.cancelled() => return,
                        outcome = call => outcome,
                    };
                    let Some(tx) = mailbox.upgrade() else { return };
                    let _ = tx.send(BackgroundMessage::ClassificationFinished { tab_id, navigation_id, url, outcome });
                });
            }
        }
    }

    async fn on_classified(
        &mut self,
        tab_id: u32,
        navigation_id: u64,
        url: &str,
        outcome: Result<ThreatAssessment, GuardError>,
    ) {
        let current = self.tabs.get(&tab_id).and_then(|t| t.navigation_id());
        if current == Some(navigation_id) {
            self.inflight.remove(&tab_id);
        }
        let assessment = self.engine.settle(url, outcome);
        self.apply_initial(tab_id, navigation_id, url, assessment).await;
    }

    async fn apply_initial(&mut self, tab_id: u32, navigation_id: u64, url: &str, assessment: ThreatAssessment) {
        let Some(tab) = self.tabs.get_mut(&tab_id) else {
            debug!(tab_id, url, "Assessment for closed tab dropped");
            return;
        };
        match tab.complete(navigation_id, url, assessment) {
            Completion::Applied(current) => {
                info!(
                    tab_id,
                    url,
                    score = current.score(),
                    risk = %current.risk_level(),
                    source = %current.source,
                    "Assessed"
                );
                self.response.respond(tab, &current, &self.pages).await;
            }
            Completion::Stale => {
                debug!(tab_id, navigation_id, url, "Stale assessment dropped");
            }
        }
    }

    async fn on_enhance(&mut self, tab_id: u32, url: &str, signal: BehaviorSignal) {
        let Some(tab) = self.tabs.get_mut(&tab_id) else {
            debug!(tab_id, url, "Enhancement for unknown tab ignored");
            return;
        };
        let delta = signal.suspicion_delta;
        match tab.enhance(url, signal) {
            Enhancement::Buffered => debug!(tab_id, url, delta, "Enhancement buffered"),
            Enhancement::Ignored => debug!(tab_id, url, delta, "Enhancement for other page ignored"),
            Enhancement::Escalated(current) => {
                info!(tab_id, url, delta, score = current.score(), "Escalated by page behavior");
                self.response.respond(tab, &current, &self.pages).await;
            }
            Enhancement::Recorded(current) => {
                self.response.respond(tab, &current, &self.pages).await;
            }
        }
    }

    async fn on_proceed(&mut self, tab_id: u32, url: &str) {
        let Some(tab) = self.tabs.get_mut(&tab_id) else { return };
        if !tab.override_block(url) {
            warn!(tab_id, url, "Override for a page no longer shown, ignored");
            return;
        }
        if let Some(current) = tab.current().cloned() {
            self.response.record_override(&current).await;
        }
    }

    fn cancel_inflight(&mut self, tab_id: u32) {
        if let Some(token) = self.inflight.remove(&tab_id) {
            token.cancel();
        }
    }
}

/// Cloneable sender side of the background mailbox.
#[derive(Clone)]
pub struct BackgroundHandle {
    tx: mpsc::UnboundedSender<BackgroundMessage>,
}

impl BackgroundHandle {
    fn send(&self, msg: BackgroundMessage) -> Result<(), GuardError> {
        self.tx
            .send(msg)
            .map_err(|_| GuardError::MessageDeliveryFailed("background process has stopped".into()))
    }

    pub fn navigate(&self, tab_id: u32, url: &str, frame_id: u32) -> Result<(), GuardError> {
        self.send(BackgroundMessage::Navigated { tab_id, url: url.to_string(), frame_id })
    }

    pub fn enhance(&self, tab_id: u32, url: &str, signal: BehaviorSignal) -> Result<(), GuardError> {
        self.send(BackgroundMessage::EnhanceScore { tab_id, url: url.to_string(), signal })
    }

    pub fn proceed_anyway(&self, tab_id: u32, url: &str) -> Result<(), GuardError> {
        self.send(BackgroundMessage::ProceedAnyway { tab_id, url: url.to_string() })
    }

    pub fn allow_host(&self, hostname: &str) -> Result<(), GuardError> {
        self.send(BackgroundMessage::AllowHost { hostname: hostname.to_string() })
    }

    pub fn close_tab(&self, tab_id: u32) -> Result<(), GuardError> {
        self.send(BackgroundMessage::TabClosed { tab_id })
    }

    /// Register a page agent for `tab_id` and return its inbox.
    pub fn attach_page(&self, tab_id: u32) -> Result<mpsc::UnboundedReceiver<PageCommand>, GuardError> {
        let (inbox, rx) = mpsc::unbounded_channel();
        self.send(BackgroundMessage::AttachPage { tab_id, inbox })?;
        Ok(rx)
    }

    /// Current assessment for the tab. Answered after every message sent
    /// before it has been handled.
    pub async fn status(&self, tab_id: u32) -> Result<Option<ThreatAssessment>, GuardError> {
        let (reply, rx) = oneshot::channel();
        self.send(BackgroundMessage::GetStatus { tab_id, reply })?;
        rx.await
            .map_err(|_| GuardError::MessageDeliveryFailed("background dropped status request".into()))
    }

    pub fn shutdown(&self) -> Result<(), GuardError> {
        self.send(BackgroundMessage::Shutdown)
    }
}

/// Spawn the background actor on the current runtime.
pub fn spawn_background(context: BackgroundContext) -> (BackgroundHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let weak = tx.downgrade();
    let task = tokio::spawn(context.run(weak, rx));
    (BackgroundHandle { tx }, task)
}

/// Outcome summary used by callers that drive a single navigation to completion.
#[derive(Debug, Clone)]
pub struct NavigationReport {
    pub assessment: ThreatAssessment,
    pub commands: Vec<PageCommand>,
}

impl NavigationReport {
    pub fn blocked(&self) -> bool {
        self.commands.iter().any(|c| matches!(c, PageCommand::ShowWarning(_)))
    }
}

impl BackgroundHandle {
    /// Navigate `tab_id` to `url` and wait until the initial assessment has
    /// been applied, collecting the commands the page would have received.
    /// The URL must pass the navigation filter or this never resolves.
    pub async fn assess(&self, tab_id: u32, url: &str) -> Result<NavigationReport, GuardError> {
        let mut inbox = self.attach_page(tab_id)?;
        self.navigate(tab_id, url, TOP_LEVEL_FRAME)?;

        let mut commands = Vec::new();
        loop {
            match inbox.recv().await {
                Some(cmd @ PageCommand::UpdateStatus { .. }) => {
                    commands.push(cmd);
                    break;
                }
                Some(other) => commands.push(other),
                None => {
                    return Err(GuardError::MessageDeliveryFailed(format!(
                        "no assessment produced for {}",
                        url
                    )))
                }
            }
        }

        let assessment = self.status(tab_id).await?.ok_or_else(|| {
            GuardError::Internal(format!("tab {} has no assessment after update", tab_id))
        })?;
        while let Ok(cmd) = inbox.try_recv() {
            commands.push(cmd);
        }
        Ok(NavigationReport { assessment, commands })
    }
}
