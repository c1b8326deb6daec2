mod cli;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use phishguard::config;
use phishguard::errors::GuardError;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    // Logs go to stderr so command output on stdout stays machine-readable.
    if cli.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(!cli.no_color)
            .with_writer(std::io::stderr)
            .init();
    }
    if cli.no_color {
        console::set_colors_enabled(false);
    }
    tracing::debug!(build = %cli::build_info(), "Starting");

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        cli::Commands::Check(args) => cli::check::handle_check(args, config_path, cli.json).await,
        cli::Commands::Score(args) => cli::score::handle_score(args, cli.json),
        cli::Commands::Health => cli::health::handle_health(config_path, cli.json).await,
        cli::Commands::History(args) => cli::history::handle_history(args, config_path, cli.json).await,
        cli::Commands::Whitelist(args) => cli::whitelist::handle_whitelist(args, config_path, cli.json).await,
        cli::Commands::Validate(args) => handle_validate(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let exit_code = match &e {
            GuardError::Config(_) | GuardError::Yaml(_) => 2,
            GuardError::InvalidUrl(_) => 5,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}

async fn handle_validate(args: cli::commands::ValidateArgs) -> Result<(), GuardError> {
    let path = std::path::PathBuf::from(&args.config);
    let config = config::parse_config(&path).await?;
    println!("Configuration is valid: {}", args.config);
    println!(
        "  classifier {} (deadline {}ms), cache {} entries / {}s, {} whitelisted",
        config.classifier.endpoint,
        config.classifier.deadline().as_millis(),
        config.cache.capacity,
        config.cache.ttl_secs,
        config.whitelist.len(),
    );
    Ok(())
}
