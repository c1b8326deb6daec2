use console::style;
use serde_json::json;
use tracing::info;
use phishguard::classifier::{RemoteClassifier, ThreatClassifier};
use phishguard::errors::GuardError;
use crate::cli::output::print_json;
use crate::cli::{build_info, load_config};

pub async fn handle_health(config_path: Option<&str>, json: bool) -> Result<(), GuardError> {
    let config = load_config(config_path).await?;
    let classifier = RemoteClassifier::new(&config.classifier)?;
    info!(endpoint = %config.classifier.endpoint, "Probing classifier");

    let status = classifier.health(config.classifier.deadline()).await?;
    if json {
        return print_json(&json!({
            "endpoint": config.classifier.endpoint,
            "status": status.status,
            "healthy": status.is_healthy(),
            "client": build_info(),
        }));
    }

    let label = if status.is_healthy() { style(status.status.as_str()).green() } else { style(status.status.as_str()).yellow() };
    println!("{}  {}", config.classifier.endpoint, label);
    println!("{}", style(build_info()).dim());
    Ok(())
}
