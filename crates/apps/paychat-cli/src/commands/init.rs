//! Write a configuration file.

use std::path::Path;

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{InitOutput, OutputFormat, Render};

/// Execute the init command.
pub fn init(
    path: &Path,
    format: OutputFormat,
    account: Option<String>,
    server: Option<String>,
    force: bool,
) -> CliResult<String> {
    if path.exists() && !force {
        return Err(CliError::ConfigExists(path.display().to_string()));
    }

    let mut config = if path.exists() {
        CliConfig::load(path)?
    } else {
        CliConfig::default()
    };
    if let Some(account) = account {
        config.wallet.account = Some(account);
    }
    if let Some(server) = server {
        config.server.base_url = server;
    }
    config.price()?;
    config.save(path)?;

    let output = InitOutput {
        config_path: path.display().to_string(),
        account: config.wallet.account.clone(),
        server: config.server.base_url.clone(),
    };
    Ok(output.render(format))
}
