//! Stateless ton_proof challenge payloads.
//!
//! ```text
//! 0             8                 16               32
//! | random bits | expiration time | hmac-sha256[..16] |
//! ```
//!
//! The payload is sent to the client hex encoded (64 chars). Everything
//! needed to check it is inside the token itself, so nothing is stored
//! between `issue` and `verify_at`.

use std::time::SystemTimeError;

use hmac::{digest::InvalidLength, Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use thiserror::Error;

use crate::clock::unix_now;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 8;
const BODY_LEN: usize = 16;
const TAG_LEN: usize = 16;

/// Decoded payload length in bytes.
pub const PAYLOAD_LEN: usize = BODY_LEN + TAG_LEN;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("secure random source unavailable: {0}")]
    RandomSource(String),
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("invalid payload signature")]
    InvalidSignature,
    #[error("payload expired")]
    Expired,
    #[error("system clock error: {0}")]
    Clock(String),
}

impl From<SystemTimeError> for PayloadError {
    fn from(err: SystemTimeError) -> Self {
        Self::Clock(err.to_string())
    }
}

#[derive(Clone)]
pub struct PayloadIssuer {
    mac: HmacSha256,
}

impl PayloadIssuer {
    pub fn new(secret: &[u8]) -> Result<Self, InvalidLength> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(secret)?,
        })
    }

    pub fn issue(&self, ttl: u64) -> Result<String, PayloadError> {
        self.issue_at(ttl, unix_now()?)
    }

    pub fn issue_at(&self, ttl: u64, now: u64) -> Result<String, PayloadError> {
        let mut payload = [0u8; PAYLOAD_LEN];
        OsRng
            .try_fill_bytes(&mut payload[..NONCE_LEN])
            .map_err(|e| PayloadError::RandomSource(e.to_string()))?;

        let expire = now.saturating_add(ttl);
        payload[NONCE_LEN..BODY_LEN].copy_from_slice(&expire.to_be_bytes());

        let mut mac = self.mac.clone();
        mac.update(&payload[..BODY_LEN]);
        let tag = mac.finalize().into_bytes();
        payload[BODY_LEN..].copy_from_slice(&tag[..TAG_LEN]);

        Ok(hex::encode(payload))
    }

    pub fn verify_at(&self, token: &str, now: u64) -> Result<(), PayloadError> {
        // only the canonical lowercase form is accepted, otherwise 'a' and 'A'
        // would both decode to the same token
        if !token.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(PayloadError::Malformed(
                "expected lowercase hex string".to_string(),
            ));
        }

        let data = hex::decode(token).map_err(|e| PayloadError::Malformed(e.to_string()))?;
        if data.len() != PAYLOAD_LEN {
            return Err(PayloadError::Malformed(format!(
                "invalid payload length, got {}, expected {}",
                data.len(),
                PAYLOAD_LEN
            )));
        }

        let mut mac = self.mac.clone();
        mac.update(&data[..BODY_LEN]);
        mac.verify_truncated_left(&data[BODY_LEN..])
            .map_err(|_| PayloadError::InvalidSignature)?;

        let mut expire_b = [0u8; 8];
        expire_b.copy_from_slice(&data[NONCE_LEN..BODY_LEN]);
        if now > u64::from_be_bytes(expire_b) {
            return Err(PayloadError::Expired);
        }

        Ok(())
    }
}
