use argon2::Error as Argon2Error;
use jsonwebtoken::errors::Error as JwtError;
use log::{error, warn};
use mongodb::error::Error as DbError;
use rocket::{
    http::Status,
    response::{self, status::Custom, Responder},
    serde::json::Json,
    Request,
};
use serde::Serialize;
use thiserror::Error;

use crate::model::common::phase::Phase;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("Failed to dispatch mail: {0}")]
    Mail(String),
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn not_found(what: String) -> Self {
        Self::Status(Status::NotFound, format!("Not found: {what}"))
    }

    pub fn bad_request(why: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, why.into())
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) | Self::Argon2(_) => Status::InternalServerError,
            Self::Jwt(_) => Status::Unauthorized,
            Self::Mail(_) => Status::BadGateway,
            Self::Rejected(rejection) => rejection.status(),
            Self::Status(status, _) => *status,
        }
    }

    /// The message shown to the client. Infrastructure failures are kept generic.
    fn public_message(&self) -> String {
        match self {
            Self::Db(_) | Self::Argon2(_) => "An internal error occurred.".to_string(),
            Self::Jwt(_) => "Invalid or expired session.".to_string(),
            Self::Mail(_) => "Failed to send the passcode, please try again.".to_string(),
            Self::Rejected(rejection) => rejection.to_string(),
            Self::Status(_, message) => message.clone(),
        }
    }
}

/// A domain-level refusal of a request. None of these leave partial state behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Identity number is not known.")]
    UnknownIdentity,
    #[error("Wallet address must be `0x` followed by 40 hex characters.")]
    InvalidAddress,
    #[error("No account exists for this contact address.")]
    UnknownAccount,
    #[error("Identity number or wallet address is already registered.")]
    DuplicateRegistration,
    #[error("Invalid contact address or passcode expired.")]
    ChallengeExpiredOrMissing,
    #[error("Invalid passcode.")]
    CodeMismatch,
    #[error("No registration found for this identity and wallet.")]
    RegistrationNotFound,
    #[error("This identity has already voted.")]
    AlreadyVoted,
    #[error("This registration has not been verified.")]
    NotVerified,
    #[error("Operation not permitted in the {actual} phase, requires the {required} phase.")]
    WrongPhase { required: Phase, actual: Phase },
    #[error("Candidate {0} does not exist.")]
    UnknownCandidate(u32),
    #[error("Candidates must be older than 18, got {0}.")]
    AgeTooLow(u32),
    #[error("Invalid phase value '{0}'.")]
    InvalidPhase(String),
}

impl Rejection {
    pub fn status(&self) -> Status {
        match self {
            Self::InvalidAddress
            | Self::ChallengeExpiredOrMissing
            | Self::AgeTooLow(_)
            | Self::InvalidPhase(_) => Status::BadRequest,
            Self::UnknownIdentity
            | Self::UnknownAccount
            | Self::RegistrationNotFound
            | Self::UnknownCandidate(_) => Status::NotFound,
            Self::DuplicateRegistration | Self::AlreadyVoted => Status::Conflict,
            Self::CodeMismatch => Status::Unauthorized,
            Self::NotVerified | Self::WrongPhase { .. } => Status::Forbidden,
        }
    }
}

/// JSON body of every failed response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        if status.code >= 500 {
            error!("{self}");
        } else {
            warn!("{self}");
        }
        let body = ErrorBody {
            success: false,
            message: self.public_message(),
        };
        Custom(status, Json(body)).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_statuses() {
        assert_eq!(Rejection::InvalidAddress.status(), Status::BadRequest);
        assert_eq!(Rejection::AgeTooLow(18).status(), Status::BadRequest);
        assert_eq!(Rejection::UnknownIdentity.status(), Status::NotFound);
        assert_eq!(Rejection::UnknownCandidate(3).status(), Status::NotFound);
        assert_eq!(Rejection::DuplicateRegistration.status(), Status::Conflict);
        assert_eq!(Rejection::AlreadyVoted.status(), Status::Conflict);
        assert_eq!(Rejection::CodeMismatch.status(), Status::Unauthorized);
        let wrong_phase = Rejection::WrongPhase {
            required: Phase::Voting,
            actual: Phase::Result,
        };
        assert_eq!(wrong_phase.status(), Status::Forbidden);
    }

    #[test]
    fn infrastructure_errors_stay_generic() {
        let err = Error::Mail("SES throttled the request".to_string());
        assert_eq!(err.status(), Status::BadGateway);
        assert!(!err.public_message().contains("SES"));

        let err: Error = Rejection::AlreadyVoted.into();
        assert_eq!(err.status(), Status::Conflict);
        assert_eq!(err.public_message(), "This identity has already voted.");
    }
}
