use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "phishguard", version, about = "Real-time phishing threat assessment for browser navigations")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs and command output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Assess URLs through the full pipeline
    Check(CheckArgs),
    /// Score a URL with the local heuristic scorer only
    Score(ScoreArgs),
    /// Probe the remote classifier's health endpoint
    Health,
    /// Show stored assessment history
    History(HistoryArgs),
    /// Manage whitelisted hostnames
    Whitelist(WhitelistArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct CheckArgs {
    /// URLs to assess
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Skip the remote classifier and use the heuristic scorer
    #[arg(long)]
    pub offline: bool,
}

#[derive(Args, Clone)]
pub struct ScoreArgs {
    pub url: String,
}

#[derive(Args, Clone)]
pub struct HistoryArgs {
    /// Number of records to show
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
}

#[derive(Args, Clone)]
pub struct WhitelistArgs {
    #[command(subcommand)]
    pub action: WhitelistAction,
}

#[derive(Subcommand, Clone)]
pub enum WhitelistAction {
    /// Exempt a hostname from analysis
    Add { hostname: String },
    /// Remove a hostname from the whitelist
    Remove { hostname: String },
    /// List whitelisted hostnames
    List,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Path to the configuration file
    pub config: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check_offline() {
        let cli = Cli::try_parse_from(["phishguard", "-vv", "check", "--offline", "https://a.test/", "https://b.test/"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Check(args) => {
                assert!(args.offline);
                assert_eq!(args.urls.len(), 2);
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["phishguard", "history", "--json", "-c", "guard.yaml", "-n", "5"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.config.as_deref(), Some("guard.yaml"));
        match cli.command {
            Commands::History(args) => assert_eq!(args.limit, 5),
            _ => panic!("expected history"),
        }
    }

    #[test]
    fn test_whitelist_requires_action() {
        assert!(Cli::try_parse_from(["phishguard", "whitelist"]).is_err());
        let cli = Cli::try_parse_from(["phishguard", "whitelist", "add", "bank.example"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Whitelist(WhitelistArgs { action: WhitelistAction::Add { .. } })
        ));
    }

    #[test]
    fn test_check_needs_url() {
        assert!(Cli::try_parse_from(["phishguard", "check"]).is_err());
    }
}
