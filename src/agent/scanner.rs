//! Pure scoring of forms and scripts against the page's own origin.

use std::sync::LazyLock;
use regex::Regex;
use url::Url;
use crate::models::{BehaviorFlag, FlagKind, Severity};
use super::dom::FormElement;

pub const CROSS_ORIGIN_ACTION: i32 = 20;
pub const PLAINTEXT_SUBMISSION: i32 = 10;
pub const TLS_DOWNGRADE: i32 = 30;
pub const EXCESSIVE_HIDDEN: i32 = 10;
pub const REDIRECT_PARAMETER: i32 = 10;
pub const DYNAMIC_CODE: i32 = 15;
pub const PASSWORD_IN_URL: i32 = 20;
pub const NEW_WINDOW: i32 = 5;
pub const CROSS_ORIGIN_SCRIPT: i32 = 5;

const MAX_HIDDEN_FIELDS: usize = 5;

const REDIRECT_NAMES: &[&str] = &[
    "redirect", "return", "returnurl", "next", "continue", "goto", "dest", "destination", "redir",
];

static DYNAMIC_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\beval\s*\(|\bnew\s+Function\s*\(|\bset(?:Timeout|Interval)\s*\(\s*["'`]|\batob\s*\("#)
        .expect("dynamic code pattern compiles")
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormFindings {
    pub delta: i32,
    pub flags: Vec<BehaviorFlag>,
}

impl FormFindings {
    fn add(&mut self, points: i32, kind: FlagKind, severity: Severity, message: String) {
        self.delta += points;
        self.flags.push(BehaviorFlag { kind, severity, message });
    }
}

/// Score a single credential form. Non-credential forms score nothing.
pub fn scan_form(page: &Url, form: &FormElement) -> FormFindings {
    let mut out = FormFindings::default();
    if !form.collects_credentials() {
        return out;
    }

    let raw_action = form.action.as_deref().map(str::trim).unwrap_or("");
    // Non-network actions (`javascript:`, `mailto:`) carry no host to compare.
    let action = page
        .join(raw_action)
        .ok()
        .filter(|a| matches!(a.scheme(), "http" | "https"));
    if let Some(action) = action {
        if action.host_str() != page.host_str() {
            out.add(
                CROSS_ORIGIN_ACTION,
                FlagKind::CrossOriginAction,
                Severity::High,
                format!("Form submits to another host ({})", action.host_str().unwrap_or("unknown")),
            );
        }
        if action.scheme() == "http" {
            if page.scheme() == "https" {
                out.add(
                    TLS_DOWNGRADE,
                    FlagKind::TlsDowngrade,
                    Severity::Critical,
                    "Secure page submits credentials over plain HTTP".to_string(),
                );
            } else {
                out.add(
                    PLAINTEXT_SUBMISSION,
                    FlagKind::PlaintextSubmission,
                    Severity::Medium,
                    "Credentials are submitted without encryption".to_string(),
                );
            }
        }
    }

    let hidden: Vec<_> = form.inputs.iter().filter(|i| i.is_hidden()).collect();
    if hidden.len() > MAX_HIDDEN_FIELDS {
        out.add(
            EXCESSIVE_HIDDEN,
            FlagKind::ExcessiveHiddenFields,
            Severity::Medium,
            format!("Form carries {} hidden fields", hidden.len()),
        );
    }
    if let Some(field) = hidden.iter().find_map(|i| {
        i.name
            .as_deref()
            .filter(|n| REDIRECT_NAMES.contains(&n.to_ascii_lowercase().as_str()))
    }) {
        out.add(
            REDIRECT_PARAMETER,
            FlagKind::RedirectParameter,
            Severity::Medium,
            format!("Hidden field '{}' redirects after submission", field),
        );
    }

    if form.handlers.iter().any(|h| DYNAMIC_CODE_RE.is_match(h)) {
        out.add(
            DYNAMIC_CODE,
            FlagKind::DynamicCodeHandler,
            Severity::High,
            "Form handler evaluates dynamically built code".to_string(),
        );
    }

    if form.has_password() && form.method_is_get() {
        out.add(
            PASSWORD_IN_URL,
            FlagKind::PasswordInUrl,
            Severity::High,
            "Password would be sent in the URL (GET form)".to_string(),
        );
    }

    let opens_window = form
        .target
        .as_deref()
        .map(|t| !matches!(t.trim().to_ascii_lowercase().as_str(), "" | "_self" | "_top" | "_parent"))
        .unwrap_or(false);
    if opens_window {
        out.add(
            NEW_WINDOW,
            FlagKind::NewWindowTarget,
            Severity::Low,
            "Form opens its result in a new window".to_string(),
        );
    }

    out
}

/// Flag for a script loaded from another host, `None` for same-host or unparsable sources.
pub fn scan_script(page: &Url, src: &str) -> Option<BehaviorFlag> {
    let resolved = page.join(src.trim()).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") || resolved.host_str() == page.host_str() {
        return None;
    }
    Some(BehaviorFlag {
        kind: FlagKind::CrossOriginScript,
        severity: Severity::Medium,
        message: format!("Script loaded from {}", resolved.host_str().unwrap_or("unknown")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::dom::InputField;

    fn login_form(action: &str) -> FormElement {
        FormElement {
            action: Some(action.to_string()),
            method: Some("post".into()),
            inputs: vec![InputField::new("email", Some("email")), InputField::new("password", Some("pw"))],
            ..Default::default()
        }
    }

    fn kinds(f: &FormFindings) -> Vec<FlagKind> {
        f.flags.iter().map(|f| f.kind).collect()
    }

    #[test]
    fn test_same_origin_post_is_clean() {
        let page = Url::parse("https://shop.test/login").unwrap();
        let f = scan_form(&page, &login_form("/session"));
        assert_eq!(f.delta, 0);
        assert!(f.flags.is_empty());
    }

    #[test]
    fn test_plaintext_cross_origin_scores_thirty() {
        let page = Url::parse("http://shop.test/login").unwrap();
        let f = scan_form(&page, &login_form("http://collector.evil/steal"));
        assert_eq!(f.delta, CROSS_ORIGIN_ACTION + PLAINTEXT_SUBMISSION);
        assert_eq!(kinds(&f), vec![FlagKind::CrossOriginAction, FlagKind::PlaintextSubmission]);
    }

    #[test]
    fn test_downgrade_replaces_plaintext() {
        let page = Url::parse("https://shop.test/login").unwrap();
        let f = scan_form(&page, &login_form("http://shop.test/session"));
        assert_eq!(f.delta, TLS_DOWNGRADE);
        assert_eq!(kinds(&f), vec![FlagKind::TlsDowngrade]);
    }

    #[test]
    fn test_hidden_fields_and_redirect() {
        let page = Url::parse("https://shop.test/").unwrap();
        let mut form = login_form("/s");
        for i in 0..5 {
            form.inputs.push(InputField::new("hidden", Some(&format!("h{}", i))));
        }
        form.inputs.push(InputField::new("hidden", Some("ReturnUrl")));
        let f = scan_form(&page, &form);
        assert_eq!(f.delta, EXCESSIVE_HIDDEN + REDIRECT_PARAMETER);
    }

    #[test]
    fn test_dynamic_handler_get_password_and_blank_target() {
        let page = Url::parse("https://shop.test/").unwrap();
        let mut form = login_form("/s");
        form.method = None;
        form.target = Some("_blank".into());
        form.handlers = vec!["return check(this) && eval(atob(payload))".into()];
        let f = scan_form(&page, &form);
        assert_eq!(f.delta, DYNAMIC_CODE + PASSWORD_IN_URL + NEW_WINDOW);
    }

    #[test]
    fn test_benign_handler_not_flagged() {
        let page = Url::parse("https://shop.test/").unwrap();
        let mut form = login_form("/s");
        form.handlers = vec!["setTimeout(submitLater, 10); return validate()".into()];
        assert_eq!(scan_form(&page, &form).delta, 0);
        form.handlers = vec!["setTimeout('go()', 10)".into()];
        assert_eq!(scan_form(&page, &form).delta, DYNAMIC_CODE);
    }

    #[test]
    fn test_non_network_actions_skip_origin_checks() {
        let page = Url::parse("http://shop.test/login").unwrap();
        for action in ["javascript:void(0)", "mailto:support@shop.test", "about:blank"] {
            let f = scan_form(&page, &login_form(action));
            assert_eq!(f.delta, 0, "action {}", action);
            assert!(f.flags.is_empty(), "action {}", action);
        }
    }

    #[test]
    fn test_search_form_ignored() {
        let page = Url::parse("http://shop.test/").unwrap();
        let form = FormElement {
            action: Some("http://search.elsewhere/".into()),
            inputs: vec![InputField::new("search", Some("q"))],
            ..Default::default()
        };
        assert_eq!(scan_form(&page, &form), FormFindings::default());
    }

    #[test]
    fn test_script_origins() {
        let page = Url::parse("https://shop.test/").unwrap();
        assert!(scan_script(&page, "/static/app.js").is_none());
        assert!(scan_script(&page, "https://shop.test/x.js").is_none());
        let flag = scan_script(&page, "//cdn.tracker.evil/kit.js").unwrap();
        assert_eq!(flag.kind, FlagKind::CrossOriginScript);
    }
}
