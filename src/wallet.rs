//! Known wallet contract versions, keyed by the hash of their code cell.
//!
//! Code and data layouts of v1r1..v4r2 come from `tonlib::wallet`. tonlib
//! ships no code for v5r1, so only its code hash and data parser live here.

use std::{collections::HashMap, fmt, sync::Arc};

use once_cell::sync::Lazy;
use thiserror::Error;
use tonlib::{
    cell::{Cell, TonCellError},
    wallet::{self as ton_wallet, WalletDataV1V2, WalletDataV3, WalletDataV4},
};

/// Representation hash of the wallet v5r1 code cell.
const WALLET_V5R1_CODE_HASH: &str =
    "20834b7b72b112147e1b2fb457b84e74d1a30f04f737d4f62a668e9552d2b72f";

static KNOWN_WALLETS: Lazy<Result<Arc<WalletRegistry>, WalletTableError>> =
    Lazy::new(|| WalletRegistry::builtin().map(Arc::new));

#[derive(Debug, Clone, Error)]
pub enum WalletTableError {
    #[error("failed to compute {version} code hash: {reason}")]
    CodeHash {
        version: WalletVersion,
        reason: String,
    },
    #[error("{0} and {1} share a code hash")]
    Duplicate(WalletVersion, WalletVersion),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalletVersion {
    V1R1,
    V1R2,
    V1R3,
    V2R1,
    V2R2,
    V3R1,
    V3R2,
    V4R1,
    V4R2,
    V5R1,
}

impl WalletVersion {
    pub const ALL: [WalletVersion; 10] = [
        WalletVersion::V1R1,
        WalletVersion::V1R2,
        WalletVersion::V1R3,
        WalletVersion::V2R1,
        WalletVersion::V2R2,
        WalletVersion::V3R1,
        WalletVersion::V3R2,
        WalletVersion::V4R1,
        WalletVersion::V4R2,
        WalletVersion::V5R1,
    ];

    /// The matching tonlib version, `None` for contracts tonlib has no code for.
    pub fn tonlib_version(self) -> Option<ton_wallet::WalletVersion> {
        let version = match self {
            WalletVersion::V1R1 => ton_wallet::WalletVersion::V1R1,
            WalletVersion::V1R2 => ton_wallet::WalletVersion::V1R2,
            WalletVersion::V1R3 => ton_wallet::WalletVersion::V1R3,
            WalletVersion::V2R1 => ton_wallet::WalletVersion::V2R1,
            WalletVersion::V2R2 => ton_wallet::WalletVersion::V2R2,
            WalletVersion::V3R1 => ton_wallet::WalletVersion::V3R1,
            WalletVersion::V3R2 => ton_wallet::WalletVersion::V3R2,
            WalletVersion::V4R1 => ton_wallet::WalletVersion::V4R1,
            WalletVersion::V4R2 => ton_wallet::WalletVersion::V4R2,
            WalletVersion::V5R1 => return None,
        };
        Some(version)
    }

    pub fn code_hash(self) -> Result<[u8; 32], TonCellError> {
        let hash = match self.tonlib_version() {
            Some(version) => version.code()?.cell_hash()?,
            None => hex::decode(WALLET_V5R1_CODE_HASH)
                .map_err(|e| TonCellError::InternalError(e.to_string()))?,
        };
        <[u8; 32]>::try_from(hash.as_slice()).map_err(|_| {
            TonCellError::InternalError(format!("{} code hash is {} bytes", self, hash.len()))
        })
    }

    /// Reads the public key out of this wallet's persistent data cell.
    pub fn read_public_key(self, data: &Cell) -> Result<[u8; 32], TonCellError> {
        let data = data.clone();
        let public_key = match self {
            WalletVersion::V1R1
            | WalletVersion::V1R2
            | WalletVersion::V1R3
            | WalletVersion::V2R1
            | WalletVersion::V2R2 => WalletDataV1V2::try_from(data)?.public_key,
            WalletVersion::V3R1 | WalletVersion::V3R2 => WalletDataV3::try_from(data)?.public_key,
            WalletVersion::V4R1 | WalletVersion::V4R2 => WalletDataV4::try_from(data)?.public_key,
            WalletVersion::V5R1 => read_v5_public_key(&data)?,
        };
        Ok(public_key)
    }
}

impl fmt::Display for WalletVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// ```text
/// is_signature_allowed:bool seqno:uint32 wallet_id:int32
/// public_key:bits256 extensions:(HashmapE 256 int1)
/// ```
fn read_v5_public_key(data: &Cell) -> Result<[u8; 32], TonCellError> {
    let mut parser = data.parser();
    parser.load_bit()?;
    parser.load_u32(32)?;
    parser.load_i32(32)?;
    let mut public_key = [0u8; 32];
    parser.load_slice(&mut public_key)?;
    Ok(public_key)
}

#[derive(Debug, Clone, Default)]
pub struct WalletRegistry {
    by_code_hash: HashMap<[u8; 32], WalletVersion>,
}

impl WalletRegistry {
    /// Registry of the standard wallet contracts, shared process wide.
    pub fn known() -> Result<Arc<WalletRegistry>, WalletTableError> {
        KNOWN_WALLETS.clone()
    }

    fn builtin() -> Result<Self, WalletTableError> {
        Self::from_versions(WalletVersion::ALL)
    }

    /// Registers each version under its code hash. Two versions with the
    /// same hash are an error.
    fn from_versions(
        versions: impl IntoIterator<Item = WalletVersion>,
    ) -> Result<Self, WalletTableError> {
        let mut registry = Self::default();
        for version in versions {
            let hash = version
                .code_hash()
                .map_err(|e| WalletTableError::CodeHash {
                    version,
                    reason: e.to_string(),
                })?;
            if let Some(existing) = registry.by_code_hash.insert(hash, version) {
                return Err(WalletTableError::Duplicate(existing, version));
            }
        }
        Ok(registry)
    }

    pub fn insert(&mut self, code_hash: [u8; 32], version: WalletVersion) {
        self.by_code_hash.insert(code_hash, version);
    }

    pub fn lookup(&self, code_hash: &[u8]) -> Option<WalletVersion> {
        let code_hash: [u8; 32] = code_hash.try_into().ok()?;
        self.by_code_hash.get(&code_hash).copied()
    }
}
