//! ton_proof verification pipeline.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. payload integrity and expiry
//! 2. proof decoding and canonical message
//! 3. wallet public key resolution
//! 4. proof timestamp freshness
//! 5. relying party domain
//! 6. ed25519 signature over the canonical message

use thiserror::Error;
use tonlib::address::TonAddress;
use tracing::{info, instrument, warn};

use crate::{
    dto::CheckProofPayload,
    payload::{PayloadError, PayloadIssuer},
    proof::{raw_address, ProofFormatError, ProofMessage},
    resolver::{KeySource, PublicKeyResolver, ResolveError},
};

#[derive(Debug, Error)]
pub enum Rejection {
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] PayloadError),
    #[error("invalid proof format: {0}")]
    InvalidProofFormat(#[from] ProofFormatError),
    #[error("cannot verify wallet: {0}")]
    KeyResolutionFailed(#[from] ResolveError),
    #[error("ton_proof has been expired")]
    ProofExpired,
    #[error("wrong domain, got {got}, expected {expected}")]
    DomainMismatch { got: String, expected: String },
    #[error("proof signature verification failed")]
    SignatureInvalid,
}

impl Rejection {
    /// Short machine readable reason, used in logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::InvalidPayload(_) => "invalid_payload",
            Rejection::InvalidProofFormat(_) => "invalid_proof_format",
            Rejection::KeyResolutionFailed(_) => "key_resolution_failed",
            Rejection::ProofExpired => "proof_expired",
            Rejection::DomainMismatch { .. } => "domain_mismatch",
            Rejection::SignatureInvalid => "signature_invalid",
        }
    }
}

/// An accepted proof.
#[derive(Debug, Clone)]
pub struct VerifiedProof {
    pub address: TonAddress,
    pub via: KeySource,
}

#[derive(Clone)]
pub struct ProofVerifier {
    payloads: PayloadIssuer,
    resolver: PublicKeyResolver,
    domain: String,
    proof_ttl: u64,
}

impl ProofVerifier {
    pub fn new(
        payloads: PayloadIssuer,
        resolver: PublicKeyResolver,
        domain: impl Into<String>,
        proof_ttl: u64,
    ) -> Self {
        Self {
            payloads,
            resolver,
            domain: domain.into(),
            proof_ttl,
        }
    }

    #[instrument(skip_all, fields(address = %request.address, network = %request.network))]
    pub async fn verify_at(
        &self,
        request: &CheckProofPayload,
        now: u64,
    ) -> Result<VerifiedProof, Rejection> {
        match self.check(request, now).await {
            Ok(verified) => {
                info!(via = ?verified.via, "ton_proof accepted");
                Ok(verified)
            }
            Err(rejection) => {
                warn!(reason = rejection.reason(), error = %rejection, "ton_proof rejected");
                Err(rejection)
            }
        }
    }

    async fn check(
        &self,
        request: &CheckProofPayload,
        now: u64,
    ) -> Result<VerifiedProof, Rejection> {
        let proof = &request.proof;

        self.payloads.verify_at(&proof.payload, now)?;

        let message = ProofMessage::parse(&request.address, proof)?;
        let canonical = message.canonical();

        let resolved = self
            .resolver
            .resolve(
                &message.address,
                request.network,
                message.state_init.as_deref(),
            )
            .await?;

        if now > message.timestamp.saturating_add(self.proof_ttl) {
            return Err(Rejection::ProofExpired);
        }

        if message.domain != self.domain {
            return Err(Rejection::DomainMismatch {
                got: message.domain,
                expected: self.domain.clone(),
            });
        }

        resolved
            .key
            .verify_strict(&canonical.digest(), &message.signature)
            .map_err(|_| Rejection::SignatureInvalid)?;

        tracing::debug!(address = %raw_address(&message.address), "signature checked");

        Ok(VerifiedProof {
            address: message.address,
            via: resolved.via,
        })
    }
}
