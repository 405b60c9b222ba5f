//! Paychat CLI binary entry point.

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use paychat_cli::{
    cli::{Cli, Commands},
    commands,
    config::{default_config_path, CliConfig},
    error::{CliError, CliResult},
    output::OutputFormat,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging based on --verbose flag or RUST_LOG env var
    let has_rust_log = std::env::var("RUST_LOG").is_ok();
    if cli.verbose || has_rust_log {
        let filter = if cli.verbose {
            EnvFilter::from_default_env().add_directive("paychat=debug".parse().unwrap())
        } else {
            EnvFilter::from_default_env()
        };
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    match run(cli).await {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            print_error(&e);
            std::process::exit(e.exit_code());
        }
    }
}

/// Print a user-friendly error message with a recovery hint.
fn print_error(e: &CliError) {
    eprintln!(
        "{} [{}]: {}",
        "Error".red().bold(),
        e.exit_code().to_string().yellow(),
        e
    );

    if let Some(hint) = e.hint() {
        eprintln!("{}: {}", "Hint".cyan(), hint);
    }
}

async fn run(cli: Cli) -> CliResult<String> {
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let format: OutputFormat = cli.format.into();

    match cli.command {
        Commands::Init {
            account,
            server,
            force,
        } => commands::init(&config_path, format, account, server, force),

        Commands::Balance => {
            let config = CliConfig::load(&config_path)?;
            commands::balance(config, format).await
        }

        Commands::Send { message } => {
            let config = CliConfig::load(&config_path)?;
            commands::send(config, format, &message.join(" ")).await
        }

        Commands::Chat => {
            let config = CliConfig::load(&config_path)?;
            commands::chat(config, format).await
        }

        Commands::Fetch { path } => {
            let config = CliConfig::load(&config_path)?;
            commands::fetch(config, format, path).await
        }
    }
}
