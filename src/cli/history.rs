use console::style;
use phishguard::db::BLOCKED_COUNT;
use phishguard::errors::GuardError;
use phishguard::models::RiskLevel;
use crate::cli::commands::HistoryArgs;
use crate::cli::output::{print_json, styled_risk};
use crate::cli::{load_config, open_database};

pub async fn handle_history(args: HistoryArgs, config_path: Option<&str>, json: bool) -> Result<(), GuardError> {
    let config = load_config(config_path).await?;
    let db = open_database(&config)?;
    let records = db.recent_history(args.limit)?;

    if json {
        return print_json(&records);
    }

    println!(
        "{} blocked in total, {} stored",
        style(db.counter(BLOCKED_COUNT)?).bold(),
        db.history_count()?
    );
    for record in &records {
        println!(
            "{}  {:>3}  {:<10}  {}{}",
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            record.score,
            styled_risk(RiskLevel::from_score(record.score)),
            record.url,
            if record.blocked { "  (blocked)" } else { "" },
        );
    }
    Ok(())
}
