use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use base64ct::{Base64, Encoding};
use tracing::warn;

use super::{repo_types::User, services::authenticate};
use crate::{error::AppError, state::AppState};

/// `Authorization: Basic` credentials, undecoded beyond the base64 layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    /// Parse an `Authorization` header value. The scheme is case-insensitive;
    /// the password may itself contain `:`.
    pub fn parse(header_value: &str) -> Option<Self> {
        let (scheme, encoded) = header_value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = Base64::decode_vec(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BasicCredentials
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
        else {
            warn!("missing Authorization header");
            return Err(AppError::NotAuthenticated);
        };
        let is_basic = value
            .trim()
            .get(..6)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("basic "));
        if !is_basic {
            warn!("Authorization header is not Basic");
            return Err(AppError::NotAuthenticated);
        }
        BasicCredentials::parse(value).ok_or_else(|| {
            warn!("malformed Basic credentials");
            AppError::Unauthorized
        })
    }
}

/// A user whose Basic credentials matched the stored hash.
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let creds = BasicCredentials::from_request_parts(parts, state).await?;
        let user = authenticate(state.users.as_ref(), &creds.username, &creds.password).await?;
        Ok(AuthenticatedUser(user))
    }
}
