//! Canonical ton_proof message.
//!
//! The wallet signs
//!
//! ```text
//! sha256(0xffff ‖ "ton-connect" ‖ sha256(message))
//! message = "ton-proof-item-v2/" ‖ workchain (i32 be) ‖ account id (32 bytes)
//!         ‖ domain length (u32 le) ‖ domain ‖ timestamp (u64 le) ‖ payload
//! ```
//!
//! Field order and endianness must match the wallet implementations exactly.

use base64::prelude::*;
use ed25519_dalek::Signature;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tonlib::address::TonAddress;

use crate::dto::TonProof;

const TON_PROOF_PREFIX: &[u8] = b"ton-proof-item-v2/";
const TON_CONNECT_PREFIX: &[u8] = b"ton-connect";

#[derive(Debug, Error)]
pub enum ProofFormatError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("invalid {field} encoding: {reason}")]
    InvalidEncoding { field: &'static str, reason: String },
    #[error("domain length mismatched against provided length_bytes of {0}")]
    DomainLengthMismatch(u64),
}

/// Proof fields decoded from the wire, still unverified.
#[derive(Debug, Clone)]
pub struct ProofMessage {
    pub address: TonAddress,
    pub domain: String,
    pub timestamp: u64,
    pub payload: String,
    pub signature: Signature,
    pub state_init: Option<String>,
}

impl ProofMessage {
    pub fn parse(address: &str, proof: &TonProof) -> Result<Self, ProofFormatError> {
        let address = TonAddress::from_hex_str(address)
            .map_err(|e| ProofFormatError::InvalidAddress(e.to_string()))?;

        let domain_len = proof.domain.value.len();
        if proof.domain.length_bytes != domain_len as u64 || u32::try_from(domain_len).is_err() {
            return Err(ProofFormatError::DomainLengthMismatch(
                proof.domain.length_bytes,
            ));
        }

        let signature: [u8; 64] = BASE64_STANDARD
            .decode(&proof.signature)
            .map_err(|e| ProofFormatError::InvalidEncoding {
                field: "signature",
                reason: e.to_string(),
            })?
            .try_into()
            .map_err(|_| ProofFormatError::InvalidEncoding {
                field: "signature",
                reason: "expected 64 byte long signature".to_string(),
            })?;

        let state_init = proof
            .state_init
            .as_ref()
            .filter(|s| !s.is_empty())
            .cloned();

        Ok(Self {
            address,
            domain: proof.domain.value.clone(),
            timestamp: proof.timestamp,
            payload: proof.payload.clone(),
            signature: Signature::from_bytes(&signature),
            state_init,
        })
    }

    pub fn canonical(&self) -> CanonicalMessage {
        let mut msg: Vec<u8> = Vec::with_capacity(
            TON_PROOF_PREFIX.len() + 4 + 32 + 4 + self.domain.len() + 8 + self.payload.len(),
        );
        msg.extend_from_slice(TON_PROOF_PREFIX);
        msg.extend_from_slice(&self.address.workchain.to_be_bytes());
        msg.extend_from_slice(&self.address.hash_part);
        // length fits, checked in parse
        msg.extend_from_slice(&(self.domain.len() as u32).to_le_bytes());
        msg.extend_from_slice(self.domain.as_bytes());
        msg.extend_from_slice(&self.timestamp.to_le_bytes());
        msg.extend_from_slice(self.payload.as_bytes());

        CanonicalMessage { message: msg }
    }
}

/// Byte preimage the wallet signed over, after hashing with [`CanonicalMessage::digest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalMessage {
    message: Vec<u8>,
}

impl CanonicalMessage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.message
    }

    pub fn digest(&self) -> [u8; 32] {
        let msg_hash = Sha256::digest(self.as_bytes());

        let mut hasher = Sha256::new();
        hasher.update([0xffu8, 0xff]);
        hasher.update(TON_CONNECT_PREFIX);
        hasher.update(msg_hash);
        hasher.finalize().into()
    }
}

/// `workchain:hex` form of an address.
pub fn raw_address(address: &TonAddress) -> String {
    format!("{}:{}", address.workchain, hex::encode(address.hash_part))
}
