//! Time-bounded memoization of URL -> assessment.
//!
//! Owned by the background actor only, so no interior locking. A single TTL
//! applies to every outcome. When the entry count exceeds the capacity, the
//! older half (by insertion order) is dropped in one pass.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use crate::models::ThreatAssessment;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: ThreatAssessment,
    expires_at: Instant,
    /// Insertion sequence; lets stale queue slots be told apart from live ones.
    seq: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

#[derive(Debug)]
pub struct ResultCache {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<(u64, String)>,
    capacity: usize,
    default_ttl: Duration,
    next_seq: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl ResultCache {
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(2),
            default_ttl,
            next_seq: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Keys are exact URLs in parsed form (host case, empty root path), so
    /// path-specific pages stay distinct.
    pub fn normalize_key(url: &str) -> String {
        let trimmed = url.trim();
        match url::Url::parse(trimmed) {
            Ok(u) => u.to_string(),
            Err(_) => trimmed.to_string(),
        }
    }

    pub fn get(&mut self, url: &str) -> Option<ThreatAssessment> {
        let key = Self::normalize_key(url);
        let now = Instant::now();
        match self.entries.get(&key) {
            Some(entry) if now <= entry.expires_at => {
                self.hits += 1;
                Some(entry.value.clone())
            }
            Some(_) => {
                self.entries.remove(&key);
                self.misses += 1;
                None
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn put(&mut self, url: &str, assessment: ThreatAssessment, ttl: Option<Duration>) {
        let key = Self::normalize_key(url);
        let seq = self.next_seq;
        self.next_seq += 1;
        let expires_at = Instant::now() + ttl.unwrap_or(self.default_ttl);
        self.entries.insert(key.clone(), CacheEntry { value: assessment, expires_at, seq });
        self.order.push_back((seq, key));

        if self.entries.len() > self.capacity {
            self.evict_oldest_half();
        }
    }

    fn evict_oldest_half(&mut self) {
        let target = self.entries.len() / 2;
        let mut removed = 0usize;
        while removed < target {
            let Some((seq, key)) = self.order.pop_front() else { break };
            // Re-inserted keys leave stale slots behind; only the live one counts.
            if self.entries.get(&key).is_some_and(|e| e.seq == seq) {
                self.entries.remove(&key);
                removed += 1;
            }
        }
        self.evictions += removed as u64;
        debug!(removed, remaining = self.entries.len(), "Result cache batch eviction");
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| now <= e.expires_at);
        let live = &self.entries;
        self.order.retain(|(seq, key)| live.get(key).is_some_and(|e| e.seq == *seq));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            entries: self.entries.len(),
        }
    }
}
