use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use serde::Serialize;
use tracing::warn;

use super::jwt::TokenError;
use crate::{
    error::{ApiError, AuthFailure},
    state::AppState,
};

/// The caller as seen by downstream handlers. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedIdentity {
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: String,
}

/// Requires a valid bearer token referring to an existing user.
pub struct AuthUser(pub AuthenticatedIdentity);

/// Like `AuthUser`, but a request without an Authorization header yields
/// `None`. A header that is present must still be valid.
pub struct MaybeAuthUser(pub Option<AuthenticatedIdentity>);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match authenticate(&parts.headers, state).await? {
            Some(identity) => Ok(AuthUser(identity)),
            None => Err(ApiError::Unauthenticated(AuthFailure::MissingToken)),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(&parts.headers, state).await.map(MaybeAuthUser)
    }
}

/// Extracts the token from `Bearer <token>`. `Ok(None)` means no header at all.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthFailure> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AuthFailure::MalformedHeader)?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .ok_or(AuthFailure::MalformedHeader)?
        .trim();
    if token.is_empty() {
        return Err(AuthFailure::MalformedHeader);
    }
    Ok(Some(token))
}

async fn authenticate(
    headers: &HeaderMap,
    state: &AppState,
) -> Result<Option<AuthenticatedIdentity>, ApiError> {
    let Some(token) = bearer_token(headers).map_err(ApiError::Unauthenticated)? else {
        return Ok(None);
    };

    let user_id = state.keys.verify(token).map_err(|e| {
        warn!(error = %e, "rejected bearer token");
        ApiError::Unauthenticated(match e {
            TokenError::Expired => AuthFailure::TokenExpired,
            TokenError::Invalid => AuthFailure::TokenInvalid,
        })
    })?;

    let user = state.users.find_by_id(user_id).await?.ok_or_else(|| {
        warn!(user_id, "token refers to a missing user");
        ApiError::Unauthenticated(AuthFailure::UnknownUser)
    })?;

    Ok(Some(AuthenticatedIdentity {
        id: user.id,
        name: user.name,
        email: user.email,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn absent_header_is_not_an_error() {
        assert_eq!(bearer_token(&HeaderMap::new()), Ok(None));
    }

    #[test]
    fn bearer_scheme_is_required() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Ok(Some("abc")));
        assert_eq!(bearer_token(&headers("bearer abc")), Ok(Some("abc")));
        assert_eq!(
            bearer_token(&headers("Basic dXNlcjpwdw==")),
            Err(AuthFailure::MalformedHeader)
        );
        assert_eq!(bearer_token(&headers("abc")), Err(AuthFailure::MalformedHeader));
    }

    #[test]
    fn empty_token_is_rejected() {
        assert_eq!(bearer_token(&headers("Bearer   ")), Err(AuthFailure::MalformedHeader));
    }
}
