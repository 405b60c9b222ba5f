//! Pay for and fetch a protected resource.

use paychat_chat::fetch_paid;

use crate::config::CliConfig;
use crate::context::ChatContext;
use crate::error::{CliError, CliResult};
use crate::output::{FetchOutput, OutputFormat, Render};

/// Execute the fetch command.
pub async fn fetch(
    config: CliConfig,
    format: OutputFormat,
    path: Option<String>,
) -> CliResult<String> {
    let ctx = ChatContext::new(config)?;
    if !ctx.session.can_pay() {
        return Err(CliError::user(
            "No payment header configured. Set wallet.payment_header to fetch paid resources.",
        ));
    }

    let path = path.unwrap_or_else(|| ctx.config.server.protected_path.clone());
    let content = fetch_paid(ctx.fetcher.as_ref(), &path).await?;

    let output = FetchOutput {
        transaction: content.transaction().map(str::to_string),
        network: content.receipt.as_ref().and_then(|r| r.network.clone()),
        path,
        body: content.body,
    };
    Ok(output.render(format))
}
