use std::fmt::{self, Display, Formatter};
use std::ops::Deref;
use std::str::FromStr;

use rand::distributions::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CODE_LENGTH: usize = 6;

/// A one-time passcode of six decimal digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Code {
    digits: [u8; CODE_LENGTH],
}

impl Code {
    /// Generate a random code.
    pub fn random() -> Self {
        let mut digits = [0; CODE_LENGTH];
        let digit_dist = Uniform::from(0..=9);
        let mut rng = rand::thread_rng();
        for digit in &mut digits {
            *digit = digit_dist.sample(&mut rng);
        }
        Self { digits }
    }
}

impl Deref for Code {
    type Target = [u8; CODE_LENGTH];

    fn deref(&self) -> &Self::Target {
        &self.digits
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for digit in self.digits {
            write!(f, "{digit}")?;
        }
        Ok(())
    }
}

impl FromStr for Code {
    type Err = CodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let len = s.chars().count();
        if len != CODE_LENGTH {
            return Err(CodeParseError::InvalidLength(len));
        }
        let mut digits = [0; CODE_LENGTH];
        for (digit, c) in digits.iter_mut().zip(s.chars()) {
            *digit = c.to_digit(10).ok_or(CodeParseError::InvalidChar(c))? as u8;
        }
        Ok(Self { digits })
    }
}

impl TryFrom<String> for Code {
    type Error = CodeParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.to_string()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodeParseError {
    #[error("code must contain exactly 6 characters, found {0}")]
    InvalidLength(usize),
    #[error("code must contain only digits, found '{0}'")]
    InvalidChar(char),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_codes_are_six_digits() {
        for _ in 0..100 {
            let code = Code::random();
            assert!(code.iter().all(|digit| *digit <= 9));
            let text = code.to_string();
            assert_eq!(text.len(), CODE_LENGTH);
            assert_eq!(text.parse::<Code>(), Ok(code));
        }
    }

    #[test]
    fn leading_zeroes_survive() {
        let code: Code = "001234".parse().unwrap();
        assert_eq!(*code, [0, 0, 1, 2, 3, 4]);
        assert_eq!(code.to_string(), "001234");
    }

    #[test]
    fn reject_invalid_codes() {
        assert_eq!(
            "12345".parse::<Code>(),
            Err(CodeParseError::InvalidLength(5))
        );
        assert_eq!(
            "12345x".parse::<Code>(),
            Err(CodeParseError::InvalidChar('x'))
        );
    }
}
