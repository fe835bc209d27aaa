use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chain::AccountStatus;

#[derive(Serialize)]
pub struct GenerateTonProofPayload {
    pub payload: String,
}

/// ```
/// {
///   "address": "0:f63660ff947e5fe6ed4a8f729f1b24ef859497d0483aaa9d9ae48414297c4e1b", // user's address
///   "network": "-239", // "-239" for mainnet and "-3" for testnet
///   "proof": {
///     "timestamp": 1668094767, // unix epoch seconds
///     "domain": {
///       "lengthBytes": 21,
///       "value": "ton-connect.github.io"
///     },
///     "signature": "28tWSg8RDB3P/iIYupySINq1o3F5xLodndzNFHOtdi16Z+MuII8LAPnHLT3E6WTB27//qY4psU5Rf5/aJaIIAA==",
///     "payload": "3f2c8d...", // payload from the step 1.
///     "state_init": "te6cckEBAwEA..." // optional, base64 boc of the wallet StateInit
///   }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CheckProofPayload {
    pub address: String,
    pub network: TonNetwork,
    pub proof: TonProof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum TonNetwork {
    #[serde(rename = "-239")]
    Mainnet,
    #[serde(rename = "-3")]
    Testnet,
}

impl TonNetwork {
    pub fn is_testnet(self) -> bool {
        matches!(self, TonNetwork::Testnet)
    }
}

impl fmt::Display for TonNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TonNetwork::Mainnet => f.write_str("-239"),
            TonNetwork::Testnet => f.write_str("-3"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TonProof {
    pub timestamp: u64,
    pub domain: TonDomain,
    pub signature: String,
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_init: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TonDomain {
    #[serde(rename = "lengthBytes")]
    pub length_bytes: u64,
    pub value: String,
}

#[derive(Serialize)]
pub struct CheckTonProof {
    pub token: String,
}

#[derive(Deserialize)]
pub struct AccountInfoQuery {
    pub network: TonNetwork,
}

#[derive(Debug, Serialize)]
pub struct AccountInfo {
    pub address: AddressForms,
    pub balance: i64,
    pub status: AccountStatus,
}

#[derive(Debug, Serialize)]
pub struct AddressForms {
    pub bounceable: String,
    pub non_bounceable: String,
    pub raw: String,
}
