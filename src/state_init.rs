//! Wallet public key extraction from a client supplied `StateInit`.
//!
//! ```text
//! _ split_depth:(Maybe (## 5)) special:(Maybe TickTock)
//!   code:(Maybe ^Cell) data:(Maybe ^Cell)
//!   library:(Maybe ^Cell) = StateInit;
//! ```
//!
//! The account id of a contract is the representation hash of its
//! `StateInit` cell, which is what binds the embedded state to the claimed
//! address.

use base64::prelude::*;
use thiserror::Error;
use tonlib::{
    address::TonAddress,
    cell::{ArcCell, BagOfCells, Cell, TonCellError},
};

use crate::wallet::{WalletRegistry, WalletVersion};

#[derive(Debug, Error)]
pub enum StateInitError {
    #[error("failed to decode state init: {0}")]
    Decode(String),
    #[error("state init does not belong to address {0}")]
    AddressMismatch(String),
    #[error("state init has no code or no data")]
    EmptyContractState,
    #[error("unknown wallet contract, code hash {0}")]
    UnknownContractVersion(String),
    #[error("failed to read public key from {version} data: {reason}")]
    PublicKey {
        version: WalletVersion,
        reason: String,
    },
}

impl From<TonCellError> for StateInitError {
    fn from(err: TonCellError) -> Self {
        Self::Decode(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct StateInit {
    root: ArcCell,
    code: Option<ArcCell>,
    data: Option<ArcCell>,
}

impl StateInit {
    /// Decodes a base64 bag of cells holding a single `StateInit` root.
    pub fn from_base64(boc: &str) -> Result<Self, StateInitError> {
        let bytes = BASE64_STANDARD
            .decode(boc.trim())
            .map_err(|e| StateInitError::Decode(e.to_string()))?;
        let boc = BagOfCells::parse(&bytes)?;
        // fails unless the bag holds exactly one root
        let root = boc.single_root()?.clone();
        Self::from_cell(root)
    }

    fn from_cell(root: ArcCell) -> Result<Self, StateInitError> {
        let (code, data) = {
            let mut parser = root.parser();
            let mut next_ref = 0;

            // split_depth
            if parser.load_bit()? {
                parser.load_u8(5)?;
            }
            // special: tick, tock
            if parser.load_bit()? {
                parser.load_u8(2)?;
            }

            let code = if parser.load_bit()? {
                next_ref += 1;
                Some(root.reference(0)?.clone())
            } else {
                None
            };
            let data = if parser.load_bit()? {
                Some(root.reference(next_ref)?.clone())
            } else {
                None
            };
            (code, data)
        };

        Ok(Self { root, code, data })
    }

    pub fn account_id(&self) -> Result<[u8; 32], StateInitError> {
        hash_of(&self.root)
    }

    /// Extracts the wallet public key, checking that this state init really
    /// is the one deployed at `address` and runs a known wallet contract.
    pub fn wallet_public_key(
        &self,
        address: &TonAddress,
        wallets: &WalletRegistry,
    ) -> Result<(WalletVersion, [u8; 32]), StateInitError> {
        if self.account_id()? != address.hash_part {
            return Err(StateInitError::AddressMismatch(format!(
                "{}:{}",
                address.workchain,
                hex::encode(address.hash_part)
            )));
        }

        let (Some(code), Some(data)) = (&self.code, &self.data) else {
            return Err(StateInitError::EmptyContractState);
        };

        let code_hash = hash_of(code)?;
        let version = wallets
            .lookup(&code_hash)
            .ok_or_else(|| StateInitError::UnknownContractVersion(hex::encode(code_hash)))?;

        let public_key = version
            .read_public_key(data)
            .map_err(|e| StateInitError::PublicKey {
                version,
                reason: e.to_string(),
            })?;

        Ok((version, public_key))
    }
}

fn hash_of(cell: &Cell) -> Result<[u8; 32], StateInitError> {
    let hash = cell.cell_hash()?;
    <[u8; 32]>::try_from(hash.as_slice())
        .map_err(|_| StateInitError::Decode("unexpected cell hash length".to_string()))
}
