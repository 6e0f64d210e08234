use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LENGTH: usize = 12;

/// A national identity number: exactly twelve decimal digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityNumber(String);

impl IdentityNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// All but the last four digits hidden, for logging.
    pub fn masked(&self) -> String {
        let visible = &self.0[LENGTH - 4..];
        format!("{}{visible}", "*".repeat(LENGTH - 4))
    }
}

impl FromStr for IdentityNumber {
    type Err = IdentityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != LENGTH {
            return Err(IdentityParseError::InvalidLength(s.len()));
        }
        if let Some(c) = s.chars().find(|c| !c.is_ascii_digit()) {
            return Err(IdentityParseError::InvalidChar(c));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for IdentityNumber {
    type Error = IdentityParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<IdentityNumber> for String {
    fn from(number: IdentityNumber) -> Self {
        number.0
    }
}

impl Display for IdentityNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityParseError {
    #[error("identity number must contain exactly 12 digits, found {0} characters")]
    InvalidLength(usize),
    #[error("identity number must contain only digits, found '{0}'")]
    InvalidChar(char),
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_number() {
        let number: IdentityNumber = "454545565656".parse().unwrap();
        assert_eq!(number.as_str(), "454545565656");
        assert_eq!(number.masked(), "********5656");
    }

    #[test]
    fn reject_invalid_numbers() {
        assert_eq!(
            "45454556565".parse::<IdentityNumber>(),
            Err(IdentityParseError::InvalidLength(11))
        );
        assert_eq!(
            "45454556565a".parse::<IdentityNumber>(),
            Err(IdentityParseError::InvalidChar('a'))
        );
    }
}
