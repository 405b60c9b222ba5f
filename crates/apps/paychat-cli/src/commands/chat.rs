//! Interactive chat command.

use std::io::Write;

use colored::Colorize;
use paychat_chat::{ChatState, Conversation, Submission};
use paychat_types::{Message, Role};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::CliConfig;
use crate::context::ChatContext;
use crate::error::{CliError, CliResult};
use crate::output::{payment_line, ChatSummaryOutput, OutputFormat, Render};

const QUIT_COMMANDS: &[&str] = &["/quit", "/exit"];

/// Execute the chat command.
pub async fn chat(config: CliConfig, format: OutputFormat) -> CliResult<String> {
    let ctx = ChatContext::new(config)?;
    let conversation = ctx.conversation()?;

    eprintln!(
        "{} {} per message. Type /quit to leave.",
        "Chatting at".bold(),
        conversation.snapshot().payment_info.amount
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();
    let mut turns = 0;
    let mut failed_turns = 0;

    loop {
        eprint!("{} ", ">".cyan().bold());
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if QUIT_COMMANDS.contains(&line) {
            break;
        }
        if line.is_empty() {
            continue;
        }

        turns += 1;
        match stream_turn(&conversation, line.to_string(), &mut stdout).await {
            Ok(_) => {
                writeln!(stdout)?;
                eprintln!("{}", payment_line(&conversation.snapshot().payment_info));
            }
            Err(CliError::Chat(e)) => {
                failed_turns += 1;
                eprintln!("{}: {}", "Error".red().bold(), e);
            }
            Err(e) => return Err(e),
        }
    }

    let output = ChatSummaryOutput {
        turns,
        failed_turns,
        messages: conversation.snapshot().messages.len(),
    };
    Ok(output.render(format))
}

fn new_reply(state: &ChatState, known: usize) -> Option<&Message> {
    state
        .messages
        .get(known..)?
        .iter()
        .find(|m| m.role == Role::Assistant)
}

fn print_new_text<W: Write>(
    state: &ChatState,
    known: usize,
    printed: &mut usize,
    out: &mut W,
) -> CliResult<()> {
    if let Some(reply) = new_reply(state, known) {
        let text = reply.text();
        if let Some(fresh) = text.get(*printed..).filter(|s| !s.is_empty()) {
            out.write_all(fresh.as_bytes())?;
            out.flush()?;
            *printed = text.len();
        }
    }
    Ok(())
}

/// Run one turn, writing reply text to `out` as it streams.
///
/// Returns the complete reply, or `None` when the server sent no text.
pub(crate) async fn stream_turn<W: Write>(
    conversation: &Conversation,
    text: String,
    out: &mut W,
) -> CliResult<Option<String>> {
    let mut rx = conversation.subscribe();
    let known = rx.borrow_and_update().messages.len();
    let mut printed = 0;

    let submit = conversation.submit(Submission::text(text));
    tokio::pin!(submit);
    let result = loop {
        tokio::select! {
            result = &mut submit => break result,
            Ok(()) = rx.changed() => {
                let state = rx.borrow_and_update().clone();
                print_new_text(&state, known, &mut printed, out)?;
            }
        }
    };

    let state = conversation.snapshot();
    print_new_text(&state, known, &mut printed, out)?;
    result?;
    Ok(new_reply(&state, known).map(Message::text))
}
