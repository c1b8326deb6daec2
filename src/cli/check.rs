use std::sync::Arc;
use serde::Serialize;
use tracing::info;
use url::Url;
use phishguard::audit::{EventSink, JsonlEventLog};
use phishguard::classifier::{RemoteClassifier, ThreatClassifier};
use phishguard::errors::GuardError;
use phishguard::models::ThreatAssessment;
use phishguard::navigation::{NavigationFilter, TOP_LEVEL_FRAME};
use phishguard::pipeline::{spawn_background, BackgroundContext, NavigationReport, PageCommand};
use crate::cli::commands::CheckArgs;
use crate::cli::output::{print_assessment, print_json};
use crate::cli::{load_config, open_database};

#[derive(Serialize)]
struct CheckResult<'a> {
    assessment: &'a ThreatAssessment,
    recommendation: phishguard::models::Recommendation,
    action: &'static str,
    warning_page: Option<String>,
}

pub async fn handle_check(args: CheckArgs, config_path: Option<&str>, json: bool) -> Result<(), GuardError> {
    let config = load_config(config_path).await?;
    let filter = NavigationFilter::new(config.classifier_host());
    for url in &args.urls {
        let parsed = Url::parse(url).map_err(|e| GuardError::InvalidUrl(format!("{}: {}", url, e)))?;
        if !filter.admit(parsed.as_str(), TOP_LEVEL_FRAME) {
            return Err(GuardError::InvalidUrl(format!(
                "{} is not analyzed (only http(s) pages other than the classifier's own host)",
                url
            )));
        }
    }

    let db = open_database(&config)?;
    let events: Arc<dyn EventSink> = Arc::new(JsonlEventLog::open(&config.storage.event_log).await?);
    let classifier: Option<Arc<dyn ThreatClassifier>> = if args.offline {
        None
    } else {
        Some(Arc::new(RemoteClassifier::new(&config.classifier)?))
    };

    let context = BackgroundContext::new(&config, classifier, db, events)?;
    let (handle, task) = spawn_background(context);
    info!(count = args.urls.len(), offline = args.offline, "Checking URLs");

    for (index, url) in args.urls.iter().enumerate() {
        let tab_id = index as u32 + 1;
        let report = handle.assess(tab_id, url).await?;
        let action = action_label(&report);
        if json {
            print_json(&CheckResult {
                assessment: &report.assessment,
                recommendation: report.assessment.recommendation(),
                action,
                warning_page: warning_location(&report),
            })?;
        } else {
            print_assessment(&report.assessment, action);
        }
        handle.close_tab(tab_id)?;
    }

    handle.shutdown()?;
    task.await.map_err(|e| GuardError::Internal(format!("background task failed: {}", e)))?;
    Ok(())
}

fn action_label(report: &NavigationReport) -> &'static str {
    if report.blocked() {
        "blocked"
    } else if report
        .commands
        .iter()
        .any(|c| matches!(c, PageCommand::UpdateStatus { banner: true, .. }))
    {
        "warned"
    } else {
        "allowed"
    }
}

fn warning_location(report: &NavigationReport) -> Option<String> {
    report.commands.iter().find_map(|c| match c {
        PageCommand::ShowWarning(view) => Some(view.location()),
        _ => None,
    })
}
