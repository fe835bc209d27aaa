use std::sync::Arc;

use ed25519_dalek::VerifyingKey;
use thiserror::Error;
use tonlib::address::TonAddress;
use tracing::debug;

use crate::{
    chain::{ChainClient, ChainError},
    dto::TonNetwork,
    state_init::{StateInit, StateInitError},
    wallet::{WalletRegistry, WalletVersion},
};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("cannot get wallet public key: {0}")]
    Unavailable(#[source] ChainError),
    #[error(transparent)]
    Embedded(#[from] StateInitError),
    #[error("invalid wallet public key: {0}")]
    InvalidKey(#[source] ed25519_dalek::SignatureError),
}

/// Where a wallet public key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Live,
    Embedded(WalletVersion),
}

#[derive(Debug, Clone)]
pub struct ResolvedKey {
    pub key: VerifyingKey,
    pub via: KeySource,
}

#[derive(Clone)]
pub struct PublicKeyResolver {
    chain: Arc<dyn ChainClient>,
    wallets: Arc<WalletRegistry>,
}

impl PublicKeyResolver {
    pub fn new(chain: Arc<dyn ChainClient>, wallets: Arc<WalletRegistry>) -> Self {
        Self { chain, wallets }
    }

    /// Looks the key up on chain and falls back to the embedded state init
    /// only when the lookup fails.
    pub async fn resolve(
        &self,
        address: &TonAddress,
        network: TonNetwork,
        state_init: Option<&str>,
    ) -> Result<ResolvedKey, ResolveError> {
        let err = match self.chain.get_public_key(address, network).await {
            Ok(key) => {
                return Ok(ResolvedKey {
                    key: VerifyingKey::from_bytes(&key).map_err(ResolveError::InvalidKey)?,
                    via: KeySource::Live,
                })
            }
            Err(err) => err,
        };

        let Some(state_init) = state_init else {
            return Err(ResolveError::Unavailable(err));
        };
        debug!(error = %err, "live public key lookup failed, using state init");

        self.resolve_embedded(address, state_init)
    }

    pub fn resolve_embedded(
        &self,
        address: &TonAddress,
        state_init: &str,
    ) -> Result<ResolvedKey, ResolveError> {
        let state = StateInit::from_base64(state_init)?;
        let (version, key) = state.wallet_public_key(address, &self.wallets)?;

        Ok(ResolvedKey {
            key: VerifyingKey::from_bytes(&key).map_err(ResolveError::InvalidKey)?,
            via: KeySource::Embedded(version),
        })
    }
}
