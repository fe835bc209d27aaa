use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::time::{timeout_at, Instant};
use tonlib::{
    address::TonAddress,
    client::TonClient,
    config::{MAINNET_CONFIG, TESTNET_CONFIG},
    contract::{TonContractFactory, TonContractInterface},
    tl::RawFullAccountState,
};

use crate::dto::TonNetwork;

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("account not found")]
    NotFound,
    #[error("liteserver timeout")]
    Timeout,
    #[error("liteserver error: {0}")]
    Client(String),
    #[error("unexpected get-method result: {0}")]
    BadResponse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Frozen,
    Uninit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub balance: i64,
    pub status: AccountStatus,
}

/// Read access to wallet contracts on chain.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Public key currently stored in the wallet contract at `address`.
    async fn get_public_key(
        &self,
        address: &TonAddress,
        network: TonNetwork,
    ) -> Result<[u8; 32], ChainError>;

    async fn get_account_state(
        &self,
        address: &TonAddress,
        network: TonNetwork,
    ) -> Result<AccountState, ChainError>;
}

pub struct TonlibChain {
    mainnet: TonContractFactory,
    testnet: TonContractFactory,
    timeout: Duration,
}

impl TonlibChain {
    pub async fn connect(request_timeout: Duration) -> anyhow::Result<Self> {
        TonClient::set_log_verbosity_level(0);
        let ton_client_mainnet = TonClient::builder()
            .with_pool_size(5)
            .with_config(MAINNET_CONFIG)
            .build()
            .await?;
        let ton_client_testnet = TonClient::builder()
            .with_pool_size(5)
            .with_config(TESTNET_CONFIG)
            .build()
            .await?;
        let mainnet = TonContractFactory::builder(&ton_client_mainnet)
            .build()
            .await?;
        let testnet = TonContractFactory::builder(&ton_client_testnet)
            .build()
            .await?;

        Ok(Self {
            mainnet,
            testnet,
            timeout: request_timeout,
        })
    }

    fn factory(&self, network: TonNetwork) -> &TonContractFactory {
        match network {
            TonNetwork::Mainnet => &self.mainnet,
            TonNetwork::Testnet => &self.testnet,
        }
    }

    async fn account_state_until(
        &self,
        address: &TonAddress,
        network: TonNetwork,
        deadline: Instant,
    ) -> Result<RawFullAccountState, ChainError> {
        timeout_at(deadline, self.factory(network).get_account_state(address))
            .await
            .map_err(|_| ChainError::Timeout)?
            .map_err(|e| ChainError::Client(e.to_string()))
    }
}

#[async_trait]
impl ChainClient for TonlibChain {
    async fn get_public_key(
        &self,
        address: &TonAddress,
        network: TonNetwork,
    ) -> Result<[u8; 32], ChainError> {
        // the get-method and the follow-up state lookup share one budget
        let deadline = Instant::now() + self.timeout;
        let wallet_contract = self.factory(network).get_contract(address);
        let res = match timeout_at(
            deadline,
            wallet_contract.run_get_method("get_public_key", &vec![]),
        )
        .await
        .map_err(|_| ChainError::Timeout)?
        {
            Ok(res) => res,
            Err(e) => {
                let status = self
                    .account_state_until(address, network, deadline)
                    .await
                    .map(|state| status_of(&state));
                return Err(get_method_failure(e, status));
            }
        };

        let pubkey_n = res
            .stack
            .get_biguint(0)
            .map_err(|e| ChainError::BadResponse(e.to_string()))?;
        left_pad_key(&pubkey_n.to_bytes_be())
    }

    async fn get_account_state(
        &self,
        address: &TonAddress,
        network: TonNetwork,
    ) -> Result<AccountState, ChainError> {
        let deadline = Instant::now() + self.timeout;
        let state = self.account_state_until(address, network, deadline).await?;

        Ok(AccountState {
            balance: state.balance,
            status: status_of(&state),
        })
    }
}

fn status_of(state: &RawFullAccountState) -> AccountStatus {
    if !state.code.is_empty() {
        AccountStatus::Active
    } else if !state.frozen_hash.is_empty() {
        AccountStatus::Frozen
    } else {
        AccountStatus::Uninit
    }
}

/// Classifies a failed `get_public_key` call by the account status looked up
/// after it. Undeployed wallets have no code to run the get-method on.
fn get_method_failure(
    err: impl std::fmt::Display,
    status: Result<AccountStatus, ChainError>,
) -> ChainError {
    match status {
        Ok(AccountStatus::Active) => ChainError::Client(err.to_string()),
        Ok(_) => ChainError::NotFound,
        Err(ChainError::Timeout) => ChainError::Timeout,
        Err(state_err) => {
            ChainError::Client(format!("{}; account state lookup: {}", err, state_err))
        }
    }
}

/// Get-method integers drop leading zero bytes.
fn left_pad_key(bytes: &[u8]) -> Result<[u8; 32], ChainError> {
    if bytes.len() > 32 {
        return Err(ChainError::BadResponse(format!(
            "public key is {} bytes long, expected 32",
            bytes.len()
        )));
    }
    let mut key = [0u8; 32];
    key[32 - bytes.len()..].copy_from_slice(bytes);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_keys_are_left_padded() {
        let key = left_pad_key(&[1, 2, 3]).unwrap();
        assert_eq!(&key[..29], &[0u8; 29]);
        assert_eq!(&key[29..], &[1, 2, 3]);
        assert_eq!(left_pad_key(&[7u8; 32]).unwrap(), [7u8; 32]);
    }

    #[test]
    fn oversized_keys_are_rejected() {
        assert!(matches!(
            left_pad_key(&[1u8; 33]),
            Err(ChainError::BadResponse(_))
        ));
    }

    #[test]
    fn failed_get_method_on_undeployed_account_is_not_found() {
        for status in [AccountStatus::Uninit, AccountStatus::Frozen] {
            assert!(matches!(
                get_method_failure("exit code -13", Ok(status)),
                ChainError::NotFound
            ));
        }
    }

    #[test]
    fn failed_get_method_on_active_account_is_client_error() {
        assert!(matches!(
            get_method_failure("exit code 11", Ok(AccountStatus::Active)),
            ChainError::Client(msg) if msg == "exit code 11"
        ));
    }

    #[test]
    fn failed_state_lookup_is_kept() {
        assert!(matches!(
            get_method_failure("exit code 11", Err(ChainError::Timeout)),
            ChainError::Timeout
        ));

        let err = get_method_failure(
            "exit code 11",
            Err(ChainError::Client("connection reset".to_string())),
        );
        let ChainError::Client(msg) = &err else {
            panic!("expected client error, got {err:?}");
        };
        assert!(msg.contains("exit code 11"));
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn account_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&AccountStatus::Uninit).unwrap(),
            r#""uninit""#
        );
    }
}
