//! Wiring from configuration to the chat core.

use std::sync::Arc;

use paychat_chat::{Conversation, Session};
use paychat_settle::{BalanceOracle, RpcBalanceOracle};
use paychat_types::AccountRef;
use paychat_x402::{PaymentFetcher, PaymentSigner, PresignedPayment, X402Fetcher};
use tracing::{debug, warn};

use crate::config::CliConfig;
use crate::error::CliResult;

/// Collaborators built from a [`CliConfig`].
pub struct ChatContext {
    /// Loaded configuration.
    pub config: CliConfig,
    /// Wallet session.
    pub session: Arc<Session>,
    /// Balance oracle.
    pub oracle: Arc<dyn BalanceOracle>,
    /// Paid HTTP fetcher.
    pub fetcher: Arc<dyn PaymentFetcher>,
}

impl ChatContext {
    /// Build the context.
    ///
    /// The session can pay only when both `wallet.account` and
    /// `wallet.payment_header` are set; with just an account it is
    /// watch-only.
    pub fn new(config: CliConfig) -> CliResult<Self> {
        let account = config.account()?.to_string();
        let header = config.wallet.payment_header.clone().unwrap_or_default();
        let signer: Arc<dyn PaymentSigner> = Arc::new(PresignedPayment::new(&account, &header));

        let session = Arc::new(Session::new());
        if header.is_empty() {
            session.init_watch_only(AccountRef::new(&account));
        } else {
            session.init(AccountRef::new(&account), signer.clone());
        }
        if let Some(key) = config.wallet.key.as_deref() {
            if session.restore_key(key).is_err() {
                warn!("Ignoring invalid wallet.key in configuration");
            }
        }

        let oracle = Arc::new(RpcBalanceOracle::new(config.rpc_config())?);
        let fetcher = Arc::new(X402Fetcher::with_timeout(
            &config.server.base_url,
            signer,
            config.server.timeout(),
        )?);
        debug!(server = %config.server.base_url, account = %account, "Chat context ready");

        Ok(Self {
            config,
            session,
            oracle,
            fetcher,
        })
    }

    /// Start a conversation over this context.
    pub fn conversation(&self) -> CliResult<Conversation> {
        Ok(Conversation::new(
            self.config.chat_config()?,
            self.session.clone(),
            self.oracle.clone(),
            self.fetcher.clone(),
        ))
    }
}

impl Drop for ChatContext {
    fn drop(&mut self) {
        self.session.teardown();
    }
}
