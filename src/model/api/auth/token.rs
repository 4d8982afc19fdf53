use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{api::id::ApiId, mongodb::Id};

/// An authenticated identity: the ID of the user a valid token was issued to.
///
/// Tokens carry nothing but the ID; the user's role is always looked up afresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthToken {
    pub id: Id,
}

impl AuthToken {
    /// Issue a signed token for the given user, valid for the configured `auth_ttl`.
    pub fn issue(user_id: Id, config: &Config) -> Result<String> {
        let claims = Claims {
            subject: user_id.into(),
            expire_at: Utc::now() + config.auth_ttl(),
        };
        Self::encode(&claims, config)
    }

    /// Verify a token's signature and expiry, recovering the identity inside.
    pub fn verify(token: &str, config: &Config) -> Result<Self> {
        jsonwebtoken::decode(
            token,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|data: TokenData<Claims>| Self {
            id: data.claims.subject.into(),
        })
        .map_err(Error::InvalidToken)
    }

    fn encode(claims: &Claims, config: &Config) -> Result<String> {
        Ok(jsonwebtoken::encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?)
    }
}

/// Token claims: the user ID plus an expiry datetime.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(rename = "sub")]
    subject: ApiId,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}
