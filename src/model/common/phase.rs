use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};

use crate::error::Rejection;

/// Stages of the election lifecycle. Any stage may be entered from any other.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Identities may register and verify their contact address.
    #[default]
    Registration,
    /// Verified registrations may cast their vote.
    Voting,
    /// Tallies are final and results may be published.
    Result,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Registration, Phase::Voting, Phase::Result];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::Voting => "voting",
            Self::Result => "result",
        }
    }

    /// Fail with [`Rejection::WrongPhase`] unless `self` is the `required` phase.
    pub fn require(self, required: Phase) -> Result<(), Rejection> {
        if self == required {
            Ok(())
        } else {
            Err(Rejection::WrongPhase {
                required,
                actual: self,
            })
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| Rejection::InvalidPhase(s.to_string()))
    }
}

impl From<Phase> for Bson {
    fn from(phase: Phase) -> Self {
        Bson::String(phase.as_str().to_string())
    }
}
