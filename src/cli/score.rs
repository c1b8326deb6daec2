use serde_json::json;
use phishguard::errors::GuardError;
use phishguard::models::RiskLevel;
use phishguard::scoring;
use crate::cli::commands::ScoreArgs;
use crate::cli::output::{print_json, styled_risk};

pub fn handle_score(args: ScoreArgs, json: bool) -> Result<(), GuardError> {
    let report = scoring::evaluate(&args.url);
    let level = RiskLevel::from_score(report.score);
    if json {
        return print_json(&json!({
            "url": args.url,
            "score": report.score,
            "risk_level": level,
            "recommendation": level.recommendation(),
            "reasons": report.reasons,
        }));
    }

    println!("{}  score {}  {}", args.url, report.score, styled_risk(level));
    for reason in &report.reasons {
        println!("    +{:>3}  {}", reason.weight, reason.message);
    }
    Ok(())
}
