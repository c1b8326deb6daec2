//! Per-tab assessment state machine.
//!
//! `Unassessed -> Assessing -> Assessed -> Escalated`, reset only by a new
//! top-level navigation. Enhancements that arrive while still `Assessing`
//! are buffered and folded in as soon as the initial verdict lands.

use serde::Serialize;
use crate::models::{BehaviorSignal, ThreatAssessment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionTaken {
    None,
    Monitored,
    Blocked,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TabPhase {
    Unassessed,
    Assessing {
        navigation_id: u64,
        url: String,
        pending: Vec<BehaviorSignal>,
    },
    Assessed {
        navigation_id: u64,
        assessment: ThreatAssessment,
    },
    Escalated {
        navigation_id: u64,
        assessment: ThreatAssessment,
    },
}

impl TabPhase {
    pub fn name(&self) -> &'static str {
        match self {
            TabPhase::Unassessed => "unassessed",
            TabPhase::Assessing { .. } => "assessing",
            TabPhase::Assessed { .. } => "assessed",
            TabPhase::Escalated { .. } => "escalated",
        }
    }
}

/// Result of delivering an initial verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The verdict (with any buffered enhancements folded in) is now current.
    Applied(ThreatAssessment),
    /// The tab moved on; the verdict was dropped.
    Stale,
}

/// Result of delivering an enhancement.
#[derive(Debug, Clone, PartialEq)]
pub enum Enhancement {
    /// Held until the initial verdict arrives.
    Buffered,
    /// Score rose; the new assessment is current.
    Escalated(ThreatAssessment),
    /// Flags recorded, score unchanged.
    Recorded(ThreatAssessment),
    /// Not for this page-load.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct TabState {
    pub tab_id: u32,
    phase: TabPhase,
    action: ActionTaken,
    /// "Proceed anyway" chosen for the current page-load.
    overridden: bool,
}

impl TabState {
    pub fn new(tab_id: u32) -> Self {
        Self {
            tab_id,
            phase: TabPhase::Unassessed,
            action: ActionTaken::None,
            overridden: false,
        }
    }

    pub fn phase(&self) -> &TabPhase {
        &self.phase
    }

    pub fn action(&self) -> ActionTaken {
        self.action
    }

    pub fn set_action(&mut self, action: ActionTaken) {
        self.action = action;
    }

    pub fn is_overridden(&self) -> bool {
        self.overridden
    }

    /// URL of the current page-load, whatever the phase.
    pub fn url(&self) -> Option<&str> {
        match &self.phase {
            TabPhase::Unassessed => None,
            TabPhase::Assessing { url, .. } => Some(url),
            TabPhase::Assessed { assessment, .. } | TabPhase::Escalated { assessment, .. } => {
                Some(&assessment.url)
            }
        }
    }

    pub fn navigation_id(&self) -> Option<u64> {
        match &self.phase {
            TabPhase::Unassessed => None,
            TabPhase::Assessing { navigation_id, .. }
            | TabPhase::Assessed { navigation_id, .. }
            | TabPhase::Escalated { navigation_id, .. } => Some(*navigation_id),
        }
    }

    pub fn current(&self) -> Option<&ThreatAssessment> {
        match &self.phase {
            TabPhase::Assessed { assessment, .. } | TabPhase::Escalated { assessment, .. } => Some(assessment),
            _ => None,
        }
    }

    /// Start a new page-load. Everything about the previous one is discarded.
    pub fn begin(&mut self, url: &str, navigation_id: u64) {
        self.phase = TabPhase::Assessing {
            navigation_id,
            url: url.to_string(),
            pending: Vec::new(),
        };
        self.action = ActionTaken::None;
        self.overridden = false;
    }

    /// Drop the current page-load without starting an assessment
    /// (navigation to a page that is never analyzed).
    pub fn reset(&mut self) {
        self.phase = TabPhase::Unassessed;
        self.action = ActionTaken::None;
        self.overridden = false;
    }

    pub fn complete(&mut self, navigation_id: u64, url: &str, assessment: ThreatAssessment) -> Completion {
        let pending = match &mut self.phase {
            TabPhase::Assessing { navigation_id: current, url: current_url, pending }
                if *current == navigation_id && current_url.as_str() == url =>
            {
                std::mem::take(pending)
            }
            _ => return Completion::Stale,
        };

        self.phase = TabPhase::Assessed { navigation_id, assessment };
        for signal in pending {
            self.merge(signal);
        }
        match self.current() {
            Some(a) => Completion::Applied(a.clone()),
            None => Completion::Stale,
        }
    }

    pub fn enhance(&mut self, url: &str, signal: BehaviorSignal) -> Enhancement {
        if let TabPhase::Assessing { url: current_url, pending, .. } = &mut self.phase {
            if current_url.as_str() != url {
                return Enhancement::Ignored;
            }
            pending.push(signal);
            return Enhancement::Buffered;
        }
        if self.url() != Some(url) {
            return Enhancement::Ignored;
        }
        self.merge(signal)
    }

    /// Fold `signal` into the current assessment. Only a strictly higher
    /// score moves the tab to `Escalated`.
    fn merge(&mut self, signal: BehaviorSignal) -> Enhancement {
        let (navigation_id, current, escalated) = match &self.phase {
            TabPhase::Assessed { navigation_id, assessment } => (*navigation_id, assessment, false),
            TabPhase::Escalated { navigation_id, assessment } => (*navigation_id, assessment, true),
            _ => return Enhancement::Ignored,
        };

        let merged = current.enhanced(signal.suspicion_delta, signal.to_reasons());
        if merged.score() > current.score() {
            self.phase = TabPhase::Escalated { navigation_id, assessment: merged.clone() };
            Enhancement::Escalated(merged)
        } else {
            // Source and score stay; only the reasons grow.
            let mut kept = current.clone();
            kept.reasons = merged.reasons;
            self.phase = if escalated {
                TabPhase::Escalated { navigation_id, assessment: kept.clone() }
            } else {
                TabPhase::Assessed { navigation_id, assessment: kept.clone() }
            };
            Enhancement::Recorded(kept)
        }
    }

    /// Record "proceed anyway" for the page-load showing `url`.
    pub fn override_block(&mut self, url: &str) -> bool {
        if self.url() == Some(url) {
            self.overridden = true;
            true
        } else {
            false
        }
    }
}
