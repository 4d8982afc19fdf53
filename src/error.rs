use argon2::Error as Argon2Error;
use jsonwebtoken::errors::Error as JwtError;
use mongodb::{bson::ser::Error as BsonError, error::Error as DbError};
use rocket::{
    http::Status,
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::RequestId;

pub type Result<T> = std::result::Result<T, Error>;

/// Message sent to clients in place of any internal error.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Bson(#[from] BsonError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    /// Failure to encode a token. Decoding failures are [`Error::InvalidToken`].
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error("{0}")]
    Internal(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    ImmutableField(String),
    #[error("You have already voted")]
    AlreadyVoted,
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("Invalid token: {0}")]
    InvalidToken(#[source] JwtError),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
}

impl Error {
    /// Shorthand for a [`Error::NotFound`] naming the missing thing.
    pub fn not_found(what: impl AsRef<str>) -> Self {
        Self::NotFound(format!("{} not found", what.as_ref()))
    }

    /// The HTTP status this error maps to.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) | Self::Bson(_) | Self::Argon2(_) | Self::Jwt(_) | Self::Internal(_) => {
                Status::InternalServerError
            }
            Self::Validation(_) | Self::Conflict(_) | Self::ImmutableField(_) | Self::AlreadyVoted => {
                Status::BadRequest
            }
            Self::Auth(_) | Self::Unauthenticated(_) | Self::InvalidToken(_) => Status::Unauthorized,
            Self::Forbidden(_) => Status::Forbidden,
            Self::NotFound(_) => Status::NotFound,
        }
    }

    /// The message safe to show to a client. Internal details are replaced.
    pub fn client_message(&self) -> String {
        if self.status() == Status::InternalServerError {
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

/// The JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// The message of an error raised by a request guard, stashed in the request's
/// local cache so the catcher can put it in the response body.
#[derive(Debug, Default)]
pub struct FailureMessage(pub Option<String>);

impl FailureMessage {
    pub fn record(req: &Request<'_>, err: &Error) {
        req.local_cache(|| Self(Some(err.client_message())));
    }

    pub fn get<'r>(req: &'r Request<'_>) -> Option<&'r str> {
        req.local_cache(Self::default).0.as_deref()
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        let id = req.local_cache(RequestId::next);
        if status == Status::InternalServerError {
            error!("req{id} failed: {self}");
        } else {
            debug!("req{id} rejected: {self}");
        }
        (status, Json(ErrorBody::new(self.client_message()))).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_details_are_hidden() {
        let err = Error::Internal("connection pool exhausted on shard 3".to_string());
        assert_eq!(err.status(), Status::InternalServerError);
        assert_eq!(err.client_message(), INTERNAL_ERROR_MESSAGE);
    }

    #[test]
    fn client_errors_keep_their_message() {
        assert_eq!(Error::AlreadyVoted.status(), Status::BadRequest);
        assert_eq!(Error::AlreadyVoted.client_message(), "You have already voted");

        let err = Error::not_found("Candidate");
        assert_eq!(err.status(), Status::NotFound);
        assert_eq!(err.client_message(), "Candidate not found");

        assert_eq!(Error::Forbidden("no".into()).status(), Status::Forbidden);
        assert_eq!(Error::Auth("no".into()).status(), Status::Unauthorized);
        assert_eq!(Error::ImmutableField("no".into()).status(), Status::BadRequest);
    }
}
