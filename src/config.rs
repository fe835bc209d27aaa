//! Process configuration, read once from the environment at startup.
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SECRET` | HMAC key for ton_proof payloads | required |
//! | `SESSION_SECRET` | HS256 key for session tokens | required |
//! | `DOMAIN` | Relying party domain expected in proofs | required |
//! | `PAYLOAD_TTL` | Payload lifetime, seconds | `300` |
//! | `PROOF_TTL` | Maximum age of a signed proof, seconds | `300` |
//! | `SESSION_TTL` | Session token lifetime, seconds | `3600` |
//! | `CHAIN_TIMEOUT_SECS` | Liteserver request timeout | `10` |
//! | `BIND_ADDR` | Listen address | `0.0.0.0:3000` |
//! | `CORS_ORIGIN` | Allowed browser origin | `http://localhost:3001` |

use std::{fmt, str::FromStr, time::Duration};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Clone)]
pub struct Config {
    pub secret: String,
    pub session_secret: String,
    pub domain: String,
    pub payload_ttl: u64,
    pub proof_ttl: u64,
    pub session_ttl: u64,
    pub chain_timeout: Duration,
    pub bind_addr: String,
    pub cors_origin: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let optional = |name: &str, default: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            secret: required("SECRET")?,
            session_secret: required("SESSION_SECRET")?,
            domain: required("DOMAIN")?,
            payload_ttl: parse("PAYLOAD_TTL", &optional("PAYLOAD_TTL", "300"))?,
            proof_ttl: parse("PROOF_TTL", &optional("PROOF_TTL", "300"))?,
            session_ttl: parse("SESSION_TTL", &optional("SESSION_TTL", "3600"))?,
            chain_timeout: Duration::from_secs(parse(
                "CHAIN_TIMEOUT_SECS",
                &optional("CHAIN_TIMEOUT_SECS", "10"),
            )?),
            bind_addr: optional("BIND_ADDR", "0.0.0.0:3000"),
            cors_origin: optional("CORS_ORIGIN", "http://localhost:3001"),
        })
    }
}

fn parse<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("secret", &"xxxxx")
            .field("session_secret", &"xxxxx")
            .field("domain", &self.domain)
            .field("payload_ttl", &self.payload_ttl)
            .field("proof_ttl", &self.proof_ttl)
            .field("session_ttl", &self.session_ttl)
            .field("chain_timeout", &self.chain_timeout)
            .field("bind_addr", &self.bind_addr)
            .field("cors_origin", &self.cors_origin)
            .finish()
    }
}
