use console::{style, StyledObject};
use phishguard::models::{RiskLevel, ThreatAssessment};

pub fn styled_risk(level: RiskLevel) -> StyledObject<&'static str> {
    let s = style(level.as_str());
    match level {
        RiskLevel::Safe => s.green(),
        RiskLevel::Suspicious => s.yellow(),
        RiskLevel::Dangerous => s.red(),
        RiskLevel::Critical => s.red().bold(),
    }
}

pub fn print_assessment(assessment: &ThreatAssessment, action: &str) {
    println!(
        "{}  score {}  {}  [{}]  {}",
        style(&assessment.url).bold(),
        style(assessment.score()).bold(),
        styled_risk(assessment.risk_level()),
        assessment.source,
        style(action).dim(),
    );
    for reason in &assessment.reasons {
        println!("    - {} ({:?})", reason.message, reason.severity);
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), phishguard::errors::GuardError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
