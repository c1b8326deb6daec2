//! Offline heuristic scorer used when the remote classifier is unavailable.
//!
//! Pure and deterministic: no I/O, no clock, never fails.

use url::{Host, Url};
use crate::models::{AssessmentSource, Severity, ThreatAssessment, ThreatReason};
use super::lookalike::imitated_brand;

/// Confidence attached to fallback verdicts.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

const SOURCE: &str = "heuristic";
const MAX_URL_LENGTH: usize = 75;
const KEYWORD_POINTS: u32 = 15;
const KEYWORD_CAP: u32 = 30;
const MIN_SUBDOMAIN_DEPTH: usize = 3;
const MIN_HOST_HYPHENS: usize = 2;

pub const PHISHING_KEYWORDS: &[&str] = &[
    "verify", "account", "update", "secure", "banking", "confirm", "login",
    "signin", "password", "urgent", "suspended", "locked", "validate",
    "restore", "limited", "unusual", "activity",
];

pub const SUSPICIOUS_TLDS: &[&str] = &[
    "tk", "ml", "ga", "cf", "gq", "xyz", "top", "work", "click", "link",
    "stream", "download", "loan", "win",
];

/// Second-level labels that make the last three labels the registrable domain.
const SECOND_LEVEL_SUFFIXES: &[&str] = &["co", "com", "org", "net", "gov", "ac", "edu"];

#[derive(Debug, Clone, PartialEq)]
pub struct FallbackReport {
    pub score: u8,
    /// Matched signals, highest weight first.
    pub reasons: Vec<ThreatReason>,
}

/// Score `url` in [0, 100].
pub fn score(url: &str) -> u8 {
    evaluate(url).score
}

/// Score `url` and wrap the result as a lower-confidence assessment.
pub fn assess(url: &str) -> ThreatAssessment {
    let report = evaluate(url);
    ThreatAssessment::new(
        url,
        report.score as i64,
        report.reasons,
        FALLBACK_CONFIDENCE,
        AssessmentSource::Fallback,
    )
}

/// Heaviest first; equal weights list the more severe reason first.
fn order_reasons(reasons: &mut [ThreatReason]) {
    reasons.sort_by(|a, b| {
        b.weight
            .cmp(&a.weight)
            .then_with(|| a.severity.rank().cmp(&b.severity.rank()))
    });
}

pub fn evaluate(url: &str) -> FallbackReport {
    let raw = url.trim();
    let lower = raw.to_ascii_lowercase();
    let mut reasons = Vec::new();

    if raw.chars().count() > MAX_URL_LENGTH {
        reasons.push(reason(
            format!("URL length exceeds {} characters", MAX_URL_LENGTH),
            Severity::Medium,
            15,
        ));
    }

    let keywords: Vec<&str> = PHISHING_KEYWORDS
        .iter()
        .copied()
        .filter(|k| lower.contains(k))
        .collect();
    if !keywords.is_empty() {
        let points = (keywords.len() as u32 * KEYWORD_POINTS).min(KEYWORD_CAP);
        reasons.push(reason(
            format!("Contains phishing-related keywords: {}", keywords.join(", ")),
            Severity::High,
            points as u8,
        ));
    }

    if lower.contains('@') {
        reasons.push(reason(
            "'@' in URL can hide the real destination host",
            Severity::High,
            20,
        ));
    }

    if let Ok(parsed) = Url::parse(raw) {
        host_signals(&parsed, &mut reasons);
    }

    order_reasons(&mut reasons);
    let total: u32 = reasons.iter().map(|r| r.weight as u32).sum();
    FallbackReport {
        score: total.min(100) as u8,
        reasons,
    }
}

fn host_signals(parsed: &Url, reasons: &mut Vec<ThreatReason>) {
    if parsed.scheme() == "http" {
        reasons.push(reason("Not using HTTPS", Severity::Low, 10));
    }

    if let Some(port) = parsed.port() {
        if port != 80 && port != 443 {
            reasons.push(reason(format!("Uses non-standard port {}", port), Severity::Medium, 12));
        }
    }

    let host = match parsed.host() {
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => {
            reasons.push(reason("Uses an IP address instead of a domain name", Severity::Critical, 30));
            return;
        }
        Some(Host::Domain(d)) => d.trim_end_matches('.').to_ascii_lowercase(),
        None => return,
    };

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    let Some(tld) = labels.last() else { return };

    if SUSPICIOUS_TLDS.contains(tld) {
        reasons.push(reason(format!("Uses commonly abused TLD .{}", tld), Severity::High, 20));
    }

    let depth = subdomain_depth(&labels);
    if depth >= MIN_SUBDOMAIN_DEPTH {
        reasons.push(reason(
            format!("Host has {} subdomain levels", depth),
            Severity::High,
            20,
        ));
    }

    let hyphens = host.matches('-').count();
    if hyphens >= MIN_HOST_HYPHENS {
        reasons.push(reason(
            format!("Host contains {} hyphens", hyphens),
            Severity::Medium,
            15,
        ));
    }

    let brand = labels[..labels.len() - 1].iter().find_map(|l| imitated_brand(l));
    if let Some(brand) = brand {
        reasons.push(reason(
            format!("Host imitates the '{}' brand", brand),
            Severity::Critical,
            25,
        ));
    }
}

fn subdomain_depth(labels: &[&str]) -> usize {
    let n = labels.len();
    let registrable = if n >= 3 && labels[n - 1].len() == 2 && SECOND_LEVEL_SUFFIXES.contains(&labels[n - 2]) {
        3
    } else {
        2
    };
    n.saturating_sub(registrable)
}

fn reason(message: impl Into<String>, severity: Severity, weight: u8) -> ThreatReason {
    ThreatReason::new(message, severity, weight, SOURCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskLevel;

    #[test]
    fn test_table_driven_scores() {
        let cases: &[(&str, u8)] = &[
            ("https://example.com", 0),
            ("https://www.rust-lang.org/learn", 0),
            ("http://example.com", 10),
            ("https://192.168.10.4/", 30),
            ("https://example.tk/", 20),
            ("https://user@example.com/", 20),
            ("https://a.b.c.example.com/", 20),
            ("https://a.b.example.co.uk/", 0),
            ("https://my-shop-online.com/", 15),
            ("https://example.com:8443/", 12),
            ("https://example.com/login", 15),
            ("https://example.com/verify/account/password", 30),
            ("https://paypa1-verify-account.com", 70),
        ];
        for (url, expected) in cases {
            assert_eq!(score(url), *expected, "score mismatch for {}", url);
        }
    }

    #[test]
    fn test_phishing_example_blocks() {
        let a = assess("https://paypa1-verify-account.com");
        assert!(a.score() >= 60);
        assert!(a.is_blocking());
        assert_eq!(a.source, AssessmentSource::Fallback);
        assert_eq!(a.confidence, FALLBACK_CONFIDENCE);
    }

    #[test]
    fn test_deterministic() {
        let url = "http://secure-login.paypa1.example.tk:8080/verify?x=@y";
        let first = evaluate(url);
        for _ in 0..10 {
            assert_eq!(evaluate(url), first);
        }
    }

    #[test]
    fn test_clamped_at_100() {
        let url = "http://secure.login.verify.account.paypa1-update-banking.tk:8080/\
                   confirm/password/suspended/locked?user=admin@target&very=long";
        assert_eq!(score(url), 100);
        assert_eq!(assess(url).risk_level(), RiskLevel::Critical);
    }

    #[test]
    fn test_malformed_inputs_never_panic() {
        for url in ["", "   ", "::::", "http://", "https://[::1", "not a url at all", "\u{0}\u{ffff}", "@@@@"] {
            let s = score(url);
            assert!(s <= 100);
        }
        // Unparsed input still sees host-independent signals.
        assert_eq!(score("verify@ your account"), 50);
    }

    #[test]
    fn test_reasons_sorted_by_weight() {
        let report = evaluate("http://192.168.0.1/login");
        let weights: Vec<u8> = report.reasons.iter().map(|r| r.weight).collect();
        let mut sorted = weights.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(weights, sorted);
        assert_eq!(report.score, 30 + 15 + 10);
    }

    #[test]
    fn test_equal_weights_order_by_severity() {
        let mut reasons = vec![
            reason("plain", Severity::Low, 10),
            reason("keyword", Severity::High, 10),
            reason("ip", Severity::Critical, 30),
            reason("port", Severity::Medium, 10),
        ];
        order_reasons(&mut reasons);
        let order: Vec<&str> = reasons.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(order, vec!["ip", "keyword", "port", "plain"]);
    }

    #[test]
    fn test_ipv6_host() {
        assert_eq!(score("https://[2001:db8::1]/"), 30);
    }
}
