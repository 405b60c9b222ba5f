//! Output formatting for CLI.

use colored::Colorize;
use paychat_types::{PaymentInfo, PaymentStatus};
use serde::Serialize;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use 'human' or 'json'.", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Human => write!(f, "human"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Trait for renderable output.
pub trait Render {
    /// Render as human-readable string.
    fn render_human(&self) -> String;

    /// Render as JSON string.
    fn render_json(&self) -> String;

    /// Render in the specified format.
    fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Human => self.render_human(),
            OutputFormat::Json => self.render_json(),
        }
    }
}

/// Colored one-line summary of a payment projection.
pub fn payment_line(info: &PaymentInfo) -> String {
    let status = match info.status {
        Some(PaymentStatus::Completed) => "completed".green(),
        Some(PaymentStatus::Processing) => "processing".yellow(),
        Some(PaymentStatus::Error) => "failed".red(),
        None => "none".dimmed(),
    };
    match &info.signature {
        Some(tx) => format!("{} {} ({}) tx {}", "Payment:".bold(), info.amount, status, tx),
        None => format!("{} {} ({})", "Payment:".bold(), info.amount, status),
    }
}

// =============================================================================
// Output Types
// =============================================================================

/// Output for configuration initialization.
#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub config_path: String,
    pub account: Option<String>,
    pub server: String,
}

impl Render for InitOutput {
    fn render_human(&self) -> String {
        let mut out = format!(
            "{} {}\n{} {}",
            "Configuration saved to:".green().bold(),
            self.config_path,
            "Server:".bold(),
            self.server
        );
        match &self.account {
            Some(account) => out.push_str(&format!("\n{} {}", "Wallet:".bold(), account)),
            None => out.push_str(&format!(
                "\n{}",
                "No wallet configured. Set wallet.account before chatting.".yellow()
            )),
        }
        out
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Output for the balance command.
#[derive(Debug, Serialize)]
pub struct BalanceOutput {
    pub account: String,
    pub balance: String,
    pub symbol: String,
    pub price: String,
    pub messages_affordable: u64,
}

impl Render for BalanceOutput {
    fn render_human(&self) -> String {
        let balance = format!("{} {}", self.balance, self.symbol);
        let balance = if self.messages_affordable == 0 {
            balance.red()
        } else {
            balance.green()
        };
        format!(
            "{} {}\n{} {}\n{} {} {} per message ({} messages)",
            "Wallet:".bold(),
            self.account,
            "Balance:".bold(),
            balance,
            "Price:".bold(),
            self.price,
            self.symbol,
            self.messages_affordable
        )
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Output for a single chat turn.
#[derive(Debug, Serialize)]
pub struct SendOutput {
    pub reply: Option<String>,
    pub payment: PaymentInfo,
}

impl Render for SendOutput {
    fn render_human(&self) -> String {
        let mut out = match &self.reply {
            Some(reply) => format!("{}\n", reply),
            None => format!("{}\n", "(no reply text)".dimmed()),
        };
        out.push_str(&payment_line(&self.payment));
        out
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Output for an interactive chat session.
#[derive(Debug, Serialize)]
pub struct ChatSummaryOutput {
    pub turns: usize,
    pub failed_turns: usize,
    pub messages: usize,
}

impl Render for ChatSummaryOutput {
    fn render_human(&self) -> String {
        format!(
            "{} {} turns ({} failed), {} messages",
            "Session ended:".bold(),
            self.turns,
            self.failed_turns,
            self.messages
        )
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Output for a paid fetch.
#[derive(Debug, Serialize)]
pub struct FetchOutput {
    pub path: String,
    pub body: String,
    pub transaction: Option<String>,
    pub network: Option<String>,
}

impl Render for FetchOutput {
    fn render_human(&self) -> String {
        let mut out = format!("{} {}\n{}", "Fetched:".green().bold(), self.path, self.body);
        match &self.transaction {
            Some(tx) => out.push_str(&format!(
                "\n{} {} on {}",
                "Paid:".bold(),
                tx,
                self.network.as_deref().unwrap_or("unknown network")
            )),
            None => out.push_str(&format!("\n{}", "No payment receipt returned".dimmed())),
        }
        out
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paychat_types::TokenAmount;

    fn price() -> TokenAmount {
        TokenAmount::parse("0.1", 6).unwrap()
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Human);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_send_output() {
        let output = SendOutput {
            reply: Some("Hello".to_string()),
            payment: PaymentInfo::settled(&price(), true, Some("abc123".into())),
        };
        let human = output.render(OutputFormat::Human);
        assert!(human.contains("Hello"));
        assert!(human.contains("abc123"));
        assert!(human.contains("$0.1"));

        let json: serde_json::Value =
            serde_json::from_str(&output.render(OutputFormat::Json)).unwrap();
        assert_eq!(json["reply"], "Hello");
        assert_eq!(json["payment"]["status"], "completed");
        assert_eq!(json["payment"]["signature"], "abc123");
    }

    #[test]
    fn test_balance_output() {
        let output = BalanceOutput {
            account: "wallet1".into(),
            balance: "0.05".into(),
            symbol: "USDC".into(),
            price: "0.1".into(),
            messages_affordable: 0,
        };
        let human = output.render(OutputFormat::Human);
        assert!(human.contains("Balance:"));
        assert!(human.contains("0.05 USDC"));

        let json = output.render(OutputFormat::Json);
        assert!(json.contains("\"messages_affordable\": 0"));
    }

    #[test]
    fn test_fetch_output_without_receipt() {
        let output = FetchOutput {
            path: "/api/protected".into(),
            body: "secret".into(),
            transaction: None,
            network: None,
        };
        let human = output.render(OutputFormat::Human);
        assert!(human.contains("secret"));
        assert!(human.contains("No payment receipt"));
    }

    #[test]
    fn test_payment_line_idle() {
        let line = payment_line(&PaymentInfo::idle(&price()));
        assert!(line.contains("$0.1"));
        assert!(line.contains("none"));
    }
}
