//! Per-page agent: scans the DOM once it settles, rescans on mutation, and
//! reports new suspicion to the background. Lives as long as the page.

use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};
use url::Url;
use crate::config::AgentConfig;
use crate::errors::GuardError;
use crate::models::{BehaviorSignal, ThreatAssessment};
use crate::pipeline::{BackgroundHandle, PageCommand, WarningView};
use super::dom::{PageEvent, PageSnapshot};
use super::scanner::{scan_form, scan_script, CROSS_ORIGIN_SCRIPT};

/// Scan bookkeeping for one page-load.
#[derive(Debug)]
pub struct PageAgent {
    url: String,
    origin: Url,
    processed_forms: HashSet<String>,
    seen_scripts: HashSet<String>,
    rescans: u32,
    max_rescans: u32,
}

impl PageAgent {
    pub fn new(url: &str, max_rescans: u32) -> Result<Self, GuardError> {
        let origin = Url::parse(url).map_err(|e| GuardError::InvalidUrl(format!("{}: {}", url, e)))?;
        Ok(Self {
            url: url.to_string(),
            origin,
            processed_forms: HashSet::new(),
            seen_scripts: HashSet::new(),
            rescans: 0,
            max_rescans,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn may_rescan(&self) -> bool {
        self.rescans < self.max_rescans
    }

    pub fn rescans(&self) -> u32 {
        self.rescans
    }

    /// Scan forms and scripts not seen before. Returns the new contribution,
    /// or `None` when nothing new qualified.
    pub fn scan(&mut self, snapshot: &PageSnapshot) -> Option<BehaviorSignal> {
        let mut signal = BehaviorSignal::default();
        // Identical id-less forms are told apart by their occurrence count.
        let mut occurrences: HashMap<String, usize> = HashMap::new();

        for form in &snapshot.forms {
            if !form.collects_credentials() {
                continue;
            }
            let base = form.key();
            let seen = occurrences.entry(base.clone()).or_insert(0);
            let key = if *seen == 0 { base } else { format!("{}~{}", base, seen) };
            *seen += 1;
            if !self.processed_forms.insert(key) {
                continue;
            }
            let findings = scan_form(&self.origin, form);
            signal.suspicion_delta += findings.delta;
            signal.flags.extend(findings.flags);
        }

        for src in &snapshot.scripts {
            if !self.seen_scripts.insert(src.trim().to_string()) {
                continue;
            }
            if let Some(flag) = scan_script(&self.origin, src) {
                signal.suspicion_delta += CROSS_ORIGIN_SCRIPT;
                signal.flags.push(flag);
            }
        }

        if signal.is_empty() { None } else { Some(signal) }
    }

    /// Like `scan` but charged against the rescan budget.
    pub fn rescan(&mut self, snapshot: &PageSnapshot) -> Option<BehaviorSignal> {
        if !self.may_rescan() {
            return None;
        }
        self.rescans += 1;
        self.scan(snapshot)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitDecision {
    Allowed,
    Blocked(String),
}

/// What the page currently shows, driven by background commands.
#[derive(Debug, Clone, Default)]
pub struct PageView {
    pub status: Option<ThreatAssessment>,
    pub banner: bool,
    /// Set once credential interception is armed.
    pub credential_block: Option<String>,
    pub warning: Option<WarningView>,
    pub submissions: Vec<SubmitDecision>,
    pub signals_sent: u32,
}

impl PageView {
    pub fn apply(&mut self, command: PageCommand) {
        match command {
            PageCommand::UpdateStatus { assessment, banner } => {
                self.status = Some(assessment);
                self.banner = banner;
            }
            PageCommand::BlockCredentials { message } => self.credential_block = Some(message),
            PageCommand::ShowWarning(view) => self.warning = Some(view),
        }
    }
}

/// Drive one page-load until it unloads. Returns the final view.
pub async fn run_page_agent(
    config: &AgentConfig,
    tab_id: u32,
    url: &str,
    background: BackgroundHandle,
    mut events: mpsc::UnboundedReceiver<PageEvent>,
) -> Result<PageView, GuardError> {
    let mut agent = PageAgent::new(url, config.max_rescans)?;
    let mut inbox = background.attach_page(tab_id)?;
    let mut view = PageView::default();
    if let Ok(Some(current)) = background.status(tab_id).await {
        view.status = Some(current);
    }

    let mut inbox_open = true;
    let mut ready = false;
    let mut initial_done = false;
    let mut latest: Option<PageSnapshot> = None;
    // Queued scan; further mutations before it fires are coalesced into `latest`.
    let mut scan_at: Option<Instant> = None;

    loop {
        // Queued events are drained before a pending scan fires.
        tokio::select! {
            biased;
            cmd = inbox.recv(), if inbox_open => match cmd {
                Some(cmd) => {
                    debug!(tab_id, kind = cmd.kind(), "Page command");
                    view.apply(cmd);
                }
                None => inbox_open = false,
            },
            event = events.recv() => match event {
                None | Some(PageEvent::Unload) => break,
                Some(PageEvent::Ready(snapshot)) => {
                    latest = Some(snapshot);
                    if !ready {
                        ready = true;
                        scan_at = Some(Instant::now() + config.settle_delay());
                    }
                }
                Some(PageEvent::Mutated(snapshot)) => {
                    latest = Some(snapshot);
                    if initial_done && scan_at.is_none() && agent.may_rescan() {
                        scan_at = Some(Instant::now());
                    }
                }
                Some(PageEvent::Submit { form_index }) => {
                    let decision = submit_decision(&view, latest.as_ref(), form_index);
                    if let SubmitDecision::Blocked(_) = decision {
                        info!(tab_id, url = agent.url(), form_index, "Credential submission blocked");
                    }
                    view.submissions.push(decision);
                }
                Some(PageEvent::ProceedAnyway) => {
                    if let Err(e) = background.proceed_anyway(tab_id, agent.url()) {
                        warn!(tab_id, error = %e, "Override not delivered");
                    }
                    view.warning = None;
                }
            },
            _ = wait_until(scan_at), if scan_at.is_some() => {
                scan_at = None;
                let Some(snapshot) = latest.as_ref() else { continue };
                let signal = if initial_done {
                    agent.rescan(snapshot)
                } else {
                    initial_done = true;
                    agent.scan(snapshot)
                };
                if let Some(signal) = signal {
                    debug!(tab_id, delta = signal.suspicion_delta, flags = signal.flags.len(), "Sending page signal");
                    match background.enhance(tab_id, agent.url(), signal) {
                        Ok(()) => view.signals_sent += 1,
                        Err(e) => warn!(tab_id, error = %e, "Page signal not delivered"),
                    }
                }
            }
        }
    }

    // Commands already queued still count toward what the page showed.
    while let Ok(cmd) = inbox.try_recv() {
        view.apply(cmd);
    }
    debug!(tab_id, rescans = agent.rescans(), signals = view.signals_sent, "Page agent finished");
    Ok(view)
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn submit_decision(view: &PageView, snapshot: Option<&PageSnapshot>, form_index: usize) -> SubmitDecision {
    let Some(message) = view.credential_block.as_ref() else {
        return SubmitDecision::Allowed;
    };
    let credentials = snapshot
        .and_then(|s| s.forms.get(form_index))
        .map(|f| f.collects_credentials())
        .unwrap_or(true);
    if credentials {
        SubmitDecision::Blocked(message.clone())
    } else {
        SubmitDecision::Allowed
    }
}
