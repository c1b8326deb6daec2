use serde::Serialize;
use phishguard::config::is_bare_hostname;
use phishguard::db::Database;
use phishguard::errors::GuardError;
use crate::cli::commands::{WhitelistAction, WhitelistArgs};
use crate::cli::output::print_json;
use crate::cli::{load_config, open_database};

/// Result of `whitelist add` / `whitelist remove`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhitelistChange {
    pub host: String,
    pub changed: bool,
}

pub async fn handle_whitelist(args: WhitelistArgs, config_path: Option<&str>, json: bool) -> Result<(), GuardError> {
    let config = load_config(config_path).await?;
    let db = open_database(&config)?;

    match args.action {
        WhitelistAction::Add { hostname } => {
            let change = add_host(&db, &hostname)?;
            if json {
                return print_json(&change);
            }
            if change.changed {
                println!("Added {}", change.host);
            } else {
                println!("{} is already whitelisted", change.host);
            }
        }
        WhitelistAction::Remove { hostname } => {
            let change = remove_host(&db, &hostname)?;
            if json {
                return print_json(&change);
            }
            if change.changed {
                println!("Removed {}", change.host);
            } else {
                println!("{} was not whitelisted", change.host);
            }
        }
        WhitelistAction::List => {
            let mut hosts = db.whitelist()?;
            for host in &config.whitelist {
                let host = host.to_ascii_lowercase();
                if !hosts.contains(&host) {
                    hosts.push(host);
                }
            }
            hosts.sort();
            if json {
                return print_json(&hosts);
            }
            for host in hosts {
                println!("{}", host);
            }
        }
    }
    Ok(())
}

fn add_host(db: &Database, hostname: &str) -> Result<WhitelistChange, GuardError> {
    let host = hostname.trim().to_ascii_lowercase();
    if !is_bare_hostname(&host) {
        return Err(GuardError::InvalidUrl(format!("'{}' is not a bare hostname", hostname)));
    }
    let changed = db.add_whitelist(&host)?;
    Ok(WhitelistChange { host, changed })
}

fn remove_host(db: &Database, hostname: &str) -> Result<WhitelistChange, GuardError> {
    let host = hostname.trim().to_ascii_lowercase();
    let changed = db.remove_whitelist(&host)?;
    Ok(WhitelistChange { host, changed })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_remove_report_changes() {
        let db = Database::in_memory().unwrap();
        assert_eq!(
            add_host(&db, " Bank.Example ").unwrap(),
            WhitelistChange { host: "bank.example".into(), changed: true }
        );
        assert!(!add_host(&db, "bank.example").unwrap().changed);
        assert!(remove_host(&db, "BANK.example").unwrap().changed);
        assert!(!remove_host(&db, "bank.example").unwrap().changed);
    }

    #[test]
    fn test_change_serializes_for_json_output() {
        let change = WhitelistChange { host: "bank.example".into(), changed: false };
        let value = serde_json::to_value(&change).unwrap();
        assert_eq!(value, serde_json::json!({"host": "bank.example", "changed": false}));
    }

    #[test]
    fn test_add_rejects_urls() {
        let db = Database::in_memory().unwrap();
        assert!(matches!(add_host(&db, "https://bank.example/"), Err(GuardError::InvalidUrl(_))));
    }
}
