use rocket::{
    request::{FromRequest, Outcome},
    Request, State,
};

use crate::config::Config;
use crate::error::{Error, FailureMessage, Result};
use crate::model::db::user::User;
use crate::store::Credentials;

use super::token::AuthToken;

/// Header carrying the bearer token.
pub const AUTHORIZATION: &str = "Authorization";

/// Scheme prefix of the header value.
pub const BEARER: &str = "Bearer ";

/// Extract the raw token from the `Authorization` header.
fn bearer_token<'a>(req: &'a Request<'_>) -> Result<&'a str> {
    let header = req
        .headers()
        .get_one(AUTHORIZATION)
        .ok_or_else(|| Error::Unauthenticated("Token not found".to_string()))?;
    header
        .strip_prefix(BEARER)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| Error::Unauthenticated("Unauthorized".to_string()))
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthToken {
    type Error = Error;

    /// Authenticate the request from its bearer token. Failure ends the request
    /// with a 401; no handler requiring an [`AuthToken`] ever runs without one.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let result = match req.guard::<&State<Config>>().await {
            Outcome::Success(config) => {
                bearer_token(req).and_then(|token| AuthToken::verify(token, config))
            }
            _ => Err(Error::Internal("Config is not managed".to_string())),
        };

        match result {
            Ok(token) => Outcome::Success(token),
            Err(err) => {
                debug!("Rejected request to {}: {err}", req.uri());
                FailureMessage::record(req, &err);
                Outcome::Failure((err.status(), err))
            }
        }
    }
}

/// Resolve an authenticated caller to their current record.
///
/// A valid token whose user has since disappeared is no better than no token.
pub async fn current_user(token: &AuthToken, credentials: &Credentials) -> Result<User> {
    credentials.find(token.id).await?.ok_or_else(|| {
        warn!("Token presented for missing user {}", token.id);
        Error::Unauthenticated("User not found".to_string())
    })
}

/// Authorize an authenticated caller as an admin by re-reading their record.
///
/// Call this before touching the target resource, so that a refusal says
/// nothing about whether the resource exists.
pub async fn require_admin(token: &AuthToken, credentials: &Credentials) -> Result<User> {
    let user = current_user(token, credentials).await?;
    if user.is_admin() {
        Ok(user)
    } else {
        warn!("User {} attempted an admin-only operation", token.id);
        Err(Error::Forbidden("User does not have Admin role".to_string()))
    }
}
