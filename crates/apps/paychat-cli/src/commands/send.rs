//! Send a single message.

use crate::commands::chat::stream_turn;
use crate::config::CliConfig;
use crate::context::ChatContext;
use crate::error::CliResult;
use crate::output::{payment_line, OutputFormat, Render, SendOutput};

/// Execute the send command.
///
/// In human format the reply is printed while it streams and only the
/// payment line is returned; JSON output is produced once the turn ends.
pub async fn send(config: CliConfig, format: OutputFormat, message: &str) -> CliResult<String> {
    let ctx = ChatContext::new(config)?;
    let conversation = ctx.conversation()?;

    let reply = match format {
        OutputFormat::Human => {
            let mut stdout = std::io::stdout();
            let reply = stream_turn(&conversation, message.to_string(), &mut stdout).await?;
            println!();
            reply
        }
        OutputFormat::Json => {
            stream_turn(&conversation, message.to_string(), &mut std::io::sink()).await?
        }
    };

    let output = SendOutput {
        reply,
        payment: conversation.snapshot().payment_info,
    };
    Ok(match format {
        OutputFormat::Human => payment_line(&output.payment),
        OutputFormat::Json => output.render_json(),
    })
}
