//! Resolution order for a navigated URL: whitelist, cache, remote, fallback.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, error, warn};
use crate::cache::{CacheStats, ResultCache};
use crate::classifier::{classify_within, ThreatClassifier};
use crate::config::GuardConfig;
use crate::errors::GuardError;
use crate::models::ThreatAssessment;
use crate::navigation::host_of;
use crate::scoring::fallback_assess;

/// Immediate answer or a remote call that still has to run.
pub enum Lookup {
    Ready(ThreatAssessment),
    Remote(BoxFuture<'static, Result<ThreatAssessment, GuardError>>),
}

pub struct AssessmentEngine {
    whitelist: HashSet<String>,
    cache: ResultCache,
    /// `None` runs offline: every miss goes straight to the fallback scorer.
    classifier: Option<Arc<dyn ThreatClassifier>>,
    deadline: Duration,
}

impl AssessmentEngine {
    pub fn new(config: &GuardConfig, classifier: Option<Arc<dyn ThreatClassifier>>) -> Self {
        Self {
            whitelist: config.whitelist.iter().map(|h| h.to_ascii_lowercase()).collect(),
            cache: ResultCache::new(config.cache.capacity, config.cache.ttl()),
            classifier,
            deadline: config.classifier.deadline(),
        }
    }

    pub fn allow_host(&mut self, hostname: &str) -> bool {
        self.whitelist.insert(hostname.trim_end_matches('.').to_ascii_lowercase())
    }

    pub fn is_whitelisted(&self, url: &str) -> bool {
        host_of(url).is_some_and(|h| self.whitelist.contains(&h))
    }

    pub fn lookup(&mut self, url: &str) -> Lookup {
        if self.is_whitelisted(url) {
            debug!(url, "Whitelisted host");
            return Lookup::Ready(ThreatAssessment::whitelisted(url));
        }
        if let Some(hit) = self.cache.get(url) {
            debug!(url, score = hit.score(), "Cache hit");
            return Lookup::Ready(hit.as_cached());
        }
        let classifier = match &self.classifier {
            Some(c) => Arc::clone(c),
            None => return Lookup::Ready(fallback_assess(url)),
        };

        let url = url.to_string();
        let deadline = self.deadline;
        Lookup::Remote(
            async move {
                // A panicking classifier must still produce an outcome for the tab.
                match AssertUnwindSafe(classify_within(classifier.as_ref(), &url, None, deadline))
                    .catch_unwind()
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(GuardError::Internal(format!("{} panicked", classifier.name()))),
                }
            }
            .boxed(),
        )
    }

    /// Turn a remote outcome into the tab's initial assessment. Successes
    /// are cached; failures degrade to the fallback scorer and are not.
    /// A tab always ends up with a verdict, so errors outside the remote
    /// taxonomy also fall back, but are reported as faults.
    pub fn settle(&mut self, url: &str, outcome: Result<ThreatAssessment, GuardError>) -> ThreatAssessment {
        let e = match outcome {
            Ok(assessment) => {
                self.cache.put(url, assessment.clone(), None);
                return assessment;
            }
            Err(e) => e,
        };
        let class = e.classify();
        let fallback = fallback_assess(url);
        if class.falls_back() {
            warn!(
                url,
                error_type = class.error_type,
                error = %e,
                score = fallback.score(),
                "Remote classification failed, using fallback"
            );
        } else {
            error!(
                url,
                error_type = class.error_type,
                recovery = ?class.recovery,
                error = %e,
                score = fallback.score(),
                "Classifier fault, using fallback"
            );
        }
        fallback
    }

    pub fn purge_expired(&mut self) -> usize {
        self.cache.purge_expired()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
