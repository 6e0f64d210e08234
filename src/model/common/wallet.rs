use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const PREFIX: &str = "0x";
pub const HEX_LENGTH: usize = 40;

/// A wallet-style account address, `0x` followed by 40 hex digits.
///
/// Addresses compare case-insensitively, so the canonical form is stored
/// with all hex digits lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonicalise a possibly-invalid address for lookups without validating it.
    pub fn canonicalize(raw: &str) -> String {
        raw.trim().to_ascii_lowercase()
    }
}

impl FromStr for WalletAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix(PREFIX).ok_or(AddressError::MissingPrefix)?;
        if hex.len() != HEX_LENGTH {
            return Err(AddressError::InvalidLength(hex.len()));
        }
        if let Some(c) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(AddressError::InvalidChar(c));
        }
        Ok(Self(format!("{PREFIX}{}", hex.to_ascii_lowercase())))
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<WalletAddress> for String {
    fn from(address: WalletAddress) -> Self {
        address.0
    }
}

impl Display for WalletAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address must start with `0x`")]
    MissingPrefix,
    #[error("address must contain exactly 40 hex characters, found {0}")]
    InvalidLength(usize),
    #[error("address contains non-hex character '{0}'")]
    InvalidChar(char),
}

/// Example data for tests.
#[cfg(test)]
pub mod examples {
    pub const MIXED_CASE: &str = "0xAbC1234567890aBcDeF1234567890AbCdEf12345";
    pub const OTHER: &str = "0x00000000000000000000000000000000000000ff";
}
