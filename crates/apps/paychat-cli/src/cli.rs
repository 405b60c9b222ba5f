//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Paychat CLI.
#[derive(Parser, Debug)]
#[command(name = "paychat")]
#[command(author = "Paychat Contributors")]
#[command(version)]
#[command(about = "Pay-per-message streaming chat client")]
#[command(
    long_about = "Paychat pays a small USDC fee per message and streams the reply.\n\nRun 'paychat init --account <ADDRESS>' to get started."
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "PAYCHAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format (human or json).
    #[arg(short, long, global = true, default_value = "human")]
    pub format: OutputFormatArg,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Output format argument for clap.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormatArg {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

/// CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a configuration file.
    Init {
        /// Address of the paying wallet.
        #[arg(short, long)]
        account: Option<String>,

        /// Base URL of the chat server.
        #[arg(short, long)]
        server: Option<String>,

        /// Overwrite an existing configuration.
        #[arg(long)]
        force: bool,
    },

    /// Show the wallet's token balance.
    Balance,

    /// Send one message and print the streamed reply.
    Send {
        /// Message text.
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },

    /// Chat interactively; each message is paid separately.
    ///
    /// Reads one message per line from stdin. Enter /quit or send EOF to
    /// leave.
    Chat,

    /// Pay for and fetch a protected resource.
    Fetch {
        /// Path on the server (defaults to server.protected_path).
        path: Option<String>,
    },
}
