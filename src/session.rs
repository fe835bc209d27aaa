use std::{fmt::Debug, time::SystemTimeError};

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tonlib::address::TonAddress;

use crate::{clock::unix_now, proof::raw_address};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session signing key is empty")]
    MissingKey,
    #[error("failed to sign session token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("invalid session token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("token expired")]
    Expired,
    #[error("system clock error: {0}")]
    Clock(#[from] SystemTimeError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub address: String,
    pub iat: u64,
    pub exp: u64,
}

/// Issues and checks HS256 session tokens bound to a wallet address.
pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionIssuer {
    pub fn new(secret: &[u8]) -> Result<Self, SessionError> {
        if secret.is_empty() {
            return Err(SessionError::MissingKey);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        })
    }

    pub fn issue(&self, address: &TonAddress, validity: u64) -> Result<String, SessionError> {
        self.issue_at(address, validity, unix_now()?)
    }

    pub fn issue_at(
        &self,
        address: &TonAddress,
        validity: u64,
        now: u64,
    ) -> Result<String, SessionError> {
        let claims = Claims {
            address: raw_address(address),
            iat: now,
            exp: now.saturating_add(validity),
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(SessionError::Signing)
    }

    pub fn validate(&self, token: &str) -> Result<Claims, SessionError> {
        self.validate_at(token, unix_now()?)
    }

    pub fn validate_at(&self, token: &str, now: u64) -> Result<Claims, SessionError> {
        let token_data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::Invalid(e),
            })?;

        // Validation::default() allows some leeway, the token lifetime is strict
        if now >= token_data.claims.exp {
            return Err(SessionError::Expired);
        }

        Ok(token_data.claims)
    }
}

// keys are never printed
impl Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("encoding", &"xxxxx".to_string())
            .field("decoding", &"xxxxx".to_string())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TEST_ADDRESS;

    fn address() -> TonAddress {
        TonAddress::from_hex_str(TEST_ADDRESS).unwrap()
    }

    #[test]
    fn issued_token_validates() {
        let issuer = SessionIssuer::new(b"secret").unwrap();
        let token = issuer.issue(&address(), 3600).unwrap();

        let claims = issuer.validate(&token).unwrap();
        assert_eq!(claims.address, TEST_ADDRESS);
        assert_eq!(claims.exp, claims.iat + 3600);
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(matches!(
            SessionIssuer::new(b""),
            Err(SessionError::MissingKey)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = SessionIssuer::new(b"secret").unwrap();
        let token = issuer
            .issue_at(&address(), 60, unix_now().unwrap() - 3600)
            .unwrap();

        assert!(matches!(issuer.validate(&token), Err(SessionError::Expired)));
    }

    #[test]
    fn token_lifetime_is_strict() {
        let issuer = SessionIssuer::new(b"secret").unwrap();
        let now = unix_now().unwrap();
        let token = issuer.issue_at(&address(), 60, now).unwrap();

        assert!(issuer.validate_at(&token, now + 59).is_ok());
        assert!(matches!(
            issuer.validate_at(&token, now + 60),
            Err(SessionError::Expired)
        ));
    }

    #[test]
    fn token_from_other_key_is_rejected() {
        let token = SessionIssuer::new(b"secret")
            .unwrap()
            .issue(&address(), 3600)
            .unwrap();
        let other = SessionIssuer::new(b"other secret").unwrap();

        assert!(matches!(other.validate(&token), Err(SessionError::Invalid(_))));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let issuer = SessionIssuer::new(b"secret").unwrap();
        assert!(matches!(
            issuer.validate("not.a.jwt"),
            Err(SessionError::Invalid(_))
        ));
    }
}
