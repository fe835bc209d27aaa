//! Fixtures shared by the unit tests.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use base64::prelude::*;
use ed25519_dalek::{Signer, SigningKey};
use tonlib::{
    address::TonAddress,
    cell::{ArcCell, BagOfCells, Cell, CellBuilder, StateInit, StateInitBuilder},
    mnemonic::KeyPair,
    wallet::{TonWallet, WalletDataV4, DEFAULT_WALLET_ID},
};

use crate::{
    chain::{AccountState, AccountStatus, ChainClient, ChainError},
    dto::{CheckProofPayload, TonDomain, TonNetwork, TonProof},
    proof::{raw_address, ProofMessage},
    wallet::{WalletRegistry, WalletVersion},
};

pub const TEST_ADDRESS: &str =
    "0:1122334455667788991122334455667788990011223344556677889900112233";

/// Stand-in for wallet contract code, registered under whichever version a
/// fixture asks for.
pub const TEST_WALLET_CODE: &[u8] = b"test wallet code";

/// In-memory chain: knows only the keys it was given, every other account is
/// reported as not found, or fails with the configured error.
#[derive(Default, Clone)]
pub struct FakeChain {
    keys: HashMap<String, [u8; 32]>,
    balances: HashMap<String, i64>,
    failure: Option<ChainError>,
}

impl FakeChain {
    pub fn with_key(mut self, address: &TonAddress, key: [u8; 32]) -> Self {
        self.keys.insert(raw_address(address), key);
        self
    }

    pub fn with_balance(mut self, address: &TonAddress, balance: i64) -> Self {
        self.balances.insert(raw_address(address), balance);
        self
    }

    /// Lookups of unknown accounts fail with `err` instead of `NotFound`.
    pub fn failing_with(mut self, err: ChainError) -> Self {
        self.failure = Some(err);
        self
    }

    fn missing(&self) -> ChainError {
        self.failure.clone().unwrap_or(ChainError::NotFound)
    }

    pub fn into_client(self) -> Arc<dyn ChainClient> {
        Arc::new(self)
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn get_public_key(
        &self,
        address: &TonAddress,
        _network: TonNetwork,
    ) -> Result<[u8; 32], ChainError> {
        self.keys
            .get(&raw_address(address))
            .copied()
            .ok_or_else(|| self.missing())
    }

    async fn get_account_state(
        &self,
        address: &TonAddress,
        _network: TonNetwork,
    ) -> Result<AccountState, ChainError> {
        self.balances
            .get(&raw_address(address))
            .map(|balance| AccountState {
                balance: *balance,
                status: AccountStatus::Active,
            })
            .ok_or_else(|| self.missing())
    }
}

/// Builds a proof request for `address` signed by `wallet`.
pub fn signed_request(
    wallet: &SigningKey,
    address: &str,
    domain: &str,
    timestamp: u64,
    payload: &str,
) -> CheckProofPayload {
    let mut proof = TonProof {
        timestamp,
        domain: TonDomain {
            length_bytes: domain.len() as u64,
            value: domain.to_string(),
        },
        signature: BASE64_STANDARD.encode([0u8; 64]),
        payload: payload.to_string(),
        state_init: None,
    };

    let digest = ProofMessage::parse(address, &proof)
        .expect("fixture proof must parse")
        .canonical()
        .digest();
    proof.signature = BASE64_STANDARD.encode(wallet.sign(&digest).to_bytes());

    CheckProofPayload {
        address: address.to_string(),
        network: TonNetwork::Mainnet,
        proof,
    }
}

pub struct WalletFixture {
    /// base64 bag of cells with the StateInit
    pub boc: String,
    /// address the StateInit deploys to, in workchain 0
    pub address: TonAddress,
    /// registry that recognizes the fixture code
    pub registry: WalletRegistry,
}

/// A v4r2-shaped wallet StateInit holding `public_key`, running stand-in code.
pub fn wallet_state_init(public_key: [u8; 32]) -> WalletFixture {
    let data: Cell = WalletDataV4 {
        seqno: 0,
        wallet_id: DEFAULT_WALLET_ID,
        public_key,
    }
    .try_into()
    .unwrap();
    fake_wallet_state_init(WalletVersion::V4R2, data)
}

/// A StateInit running stand-in code registered as `version`, with `data`
/// as the persistent data cell.
pub fn fake_wallet_state_init(version: WalletVersion, data: Cell) -> WalletFixture {
    let code = Arc::new(
        CellBuilder::new()
            .store_slice(TEST_WALLET_CODE)
            .unwrap()
            .build()
            .unwrap(),
    );
    let code_hash: [u8; 32] = code.cell_hash().unwrap().as_slice().try_into().unwrap();
    let data = Arc::new(data);
    let account_id: [u8; 32] = StateInit::create_account_id(&code, &data)
        .unwrap()
        .as_slice()
        .try_into()
        .unwrap();

    let mut registry = WalletRegistry::default();
    registry.insert(code_hash, version);

    WalletFixture {
        boc: state_init_boc(&code, &data),
        address: TonAddress::from_hex_str(&format!("0:{}", hex::encode(account_id))).unwrap(),
        registry,
    }
}

/// StateInit of a fresh standard wallet, as a wallet app sends it before the
/// first transfer deploys the contract. Returns the base64 BOC and the
/// address tonlib derives for the same wallet.
pub fn standard_state_init(version: WalletVersion, public_key: [u8; 32]) -> (String, TonAddress) {
    let version = version
        .tonlib_version()
        .expect("tonlib ships code for this version");
    let key_pair = KeyPair {
        public_key: public_key.to_vec(),
        secret_key: Vec::new(),
    };
    let data = version.initial_data(&key_pair, DEFAULT_WALLET_ID).unwrap();
    let boc = state_init_boc(version.code().unwrap(), &data);
    let wallet = TonWallet::derive_default(version, &key_pair).unwrap();
    (boc, wallet.address)
}

fn state_init_boc(code: &ArcCell, data: &ArcCell) -> String {
    let root = StateInitBuilder::new(code, data).build().unwrap();
    BASE64_STANDARD.encode(BagOfCells::from_root(root).serialize(true).unwrap())
}
