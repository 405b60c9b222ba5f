//! Wallet session.
//!
//! A [`Session`] binds the paying account and its payment signer for the
//! lifetime of a conversation. It is initialized once, read on every turn,
//! and torn down explicitly; there is no ambient global wallet.

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use paychat_types::AccountRef;
use paychat_x402::PaymentSigner;
use tracing::{debug, info, warn};

use crate::error::{ChatError, ChatResult};

/// Length of persisted secret key material, in bytes.
pub const KEY_LENGTH: usize = 32;

/// Secret key bytes restored from persisted storage.
///
/// The session only holds the key so it survives until a signer is built
/// from it; payment headers are produced by the injected
/// [`PaymentSigner`], never from these bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial([u8; KEY_LENGTH]);

impl KeyMaterial {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Decode base64url (unpadded) key material.
    ///
    /// Padding, if present, is tolerated. Anything that does not decode to
    /// exactly [`KEY_LENGTH`] bytes is rejected.
    pub fn from_base64url(encoded: &str) -> ChatResult<Self> {
        let decoded = URL_SAFE_NO_PAD
            .decode(encoded.trim().trim_end_matches('='))
            .map_err(|e| ChatError::InvalidKey(e.to_string()))?;
        let bytes: [u8; KEY_LENGTH] = decoded.try_into().map_err(|v: Vec<u8>| {
            ChatError::InvalidKey(format!("expected {} bytes, got {}", KEY_LENGTH, v.len()))
        })?;
        Ok(Self(bytes))
    }

    /// Encode as base64url without padding.
    pub fn to_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial(..)")
    }
}

struct Wallet {
    account: AccountRef,
    signer: Option<Arc<dyn PaymentSigner>>,
    key: Option<KeyMaterial>,
}

/// The paying identity for one conversation.
#[derive(Default)]
pub struct Session {
    wallet: RwLock<Option<Wallet>>,
}

impl Session {
    /// Create a session with no wallet bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session already bound to `account` and `signer`.
    pub fn with_wallet(account: AccountRef, signer: Arc<dyn PaymentSigner>) -> Self {
        let session = Self::new();
        session.init(account, signer);
        session
    }

    /// Bind an account and its signer, replacing any previous binding.
    pub fn init(&self, account: AccountRef, signer: Arc<dyn PaymentSigner>) {
        info!(account = %account, payer = %signer.payer(), "Wallet session initialized");
        *self.write() = Some(Wallet {
            account,
            signer: Some(signer),
            key: None,
        });
    }

    /// Bind an account that can be queried but cannot pay.
    pub fn init_watch_only(&self, account: AccountRef) {
        debug!(account = %account, "Watch-only session initialized");
        *self.write() = Some(Wallet {
            account,
            signer: None,
            key: None,
        });
    }

    /// Attach persisted key material to the bound wallet.
    ///
    /// Key material that fails to decode is discarded and the error is
    /// returned; the existing binding is left as it was.
    pub fn restore_key(&self, encoded: &str) -> ChatResult<()> {
        let key = match KeyMaterial::from_base64url(encoded) {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "Discarding persisted key material");
                return Err(e);
            }
        };
        match self.write().as_mut() {
            Some(wallet) => {
                wallet.key = Some(key);
                Ok(())
            }
            None => Err(ChatError::WalletUnavailable),
        }
    }

    /// Drop the binding and any key material.
    pub fn teardown(&self) {
        if self.write().take().is_some() {
            info!("Wallet session torn down");
        }
    }

    /// Whether an account is bound.
    pub fn is_active(&self) -> bool {
        self.read().is_some()
    }

    /// Whether the bound wallet can pay.
    pub fn can_pay(&self) -> bool {
        self.read().as_ref().is_some_and(|w| w.signer.is_some())
    }

    /// The bound account, if any.
    pub fn account(&self) -> Option<AccountRef> {
        self.read().as_ref().map(|w| w.account.clone())
    }

    /// The signer of the bound wallet, if any.
    pub fn signer(&self) -> Option<Arc<dyn PaymentSigner>> {
        self.read().as_ref().and_then(|w| w.signer.clone())
    }

    /// Whether key material has been restored.
    pub fn has_key(&self) -> bool {
        self.read().as_ref().is_some_and(|w| w.key.is_some())
    }

    /// The account to charge, provided the wallet can pay.
    pub fn paying_account(&self) -> ChatResult<AccountRef> {
        match self.read().as_ref() {
            Some(Wallet {
                account,
                signer: Some(_),
                ..
            }) => Ok(account.clone()),
            _ => Err(ChatError::WalletUnavailable),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Wallet>> {
        self.wallet.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Wallet>> {
        self.wallet.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("account", &self.account())
            .field("can_pay", &self.can_pay())
            .finish()
    }
}
