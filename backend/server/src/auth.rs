//! # Sessions
//!
//! - Passwords are hashed with Argon2id on a blocking thread
//! - Sessions are HS256 JWTs carrying the user id and the role at issue time
//! - The token travels either as `Authorization: Bearer <jwt>` or in the
//!   `token` cookie (HttpOnly, SameSite=Lax)
//! - The role inside the token is informational only; every check reloads the
//!   user so role changes and deletions apply immediately
use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
    extract::FromRequestParts,
    http::{
        HeaderMap,
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use pantry::{Role, User};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use tokio::task::spawn_blocking;
use tracing::debug;

use crate::{error::AppError, state::AppState};

pub const TOKEN_COOKIE: &str = "token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn can_sell(&self) -> bool {
        matches!(self.role, Role::Vendor | Role::Admin)
    }
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: TimeDelta,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: TimeDelta::hours(ttl_hours.max(1)),
        }
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.num_seconds()
    }

    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        let issued_at = Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            role: user.role,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(AppError::internal)
    }

    /// Signature and expiry check. Any failure reads as "no session".
    pub fn verify(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| debug!("Rejected token: {e}"))
            .ok()
    }
}

pub async fn hash_password(password: String) -> Result<String, AppError> {
    spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(AppError::internal)
    })
    .await
    .map_err(AppError::internal)?
}

pub async fn verify_password(password: String, hash: String) -> bool {
    spawn_blocking(move || {
        PasswordHash::new(&hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    })
    .await
    .unwrap_or(false)
}

/// Bearer header first, then the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

pub fn session_cookie(token: &str, max_age: i64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };

    format!("{TOKEN_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}{secure}")
}

pub fn expired_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

/// Any signed-in caller.
pub struct AuthUser(pub Identity);

/// Vendors and admins.
pub struct VendorUser(pub Identity);

pub struct AdminUser(pub Identity);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(Self(identity.clone()));
        }

        let token = session_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let identity = state
            .gate
            .resolver()
            .resolve(&token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        parts.extensions.insert(identity.clone());

        Ok(Self(identity))
    }
}

impl FromRequestParts<Arc<AppState>> for VendorUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(identity) = AuthUser::from_request_parts(parts, state).await?;

        if !identity.can_sell() {
            return Err(AppError::Forbidden);
        }

        Ok(Self(identity))
    }
}

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(identity) = AuthUser::from_request_parts(parts, state).await?;

        if !identity.is_admin() {
            return Err(AppError::Forbidden);
        }

        Ok(Self(identity))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn user() -> User {
        User::new("Ada".into(), "ada@example.com".into(), "hash".into())
    }

    #[test]
    fn issued_token_verifies() {
        let signer = TokenSigner::new("test-secret", 1);
        let user = user();
        let token = signer.issue(&user).unwrap();

        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Customer);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = TokenSigner::new("one", 1).issue(&user()).unwrap();
        assert!(TokenSigner::new("two", 1).verify(&token).is_none());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(TokenSigner::new("one", 1).verify("not.a.jwt").is_none());
    }

    #[tokio::test]
    async fn password_roundtrip() {
        let hash = hash_password("hunter22".into()).await.unwrap();

        assert!(verify_password("hunter22".into(), hash.clone()).await);
        assert!(!verify_password("hunter23".into(), hash).await);
        assert!(!verify_password("hunter22".into(), "not-a-hash".into()).await);
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(COOKIE, HeaderValue::from_static("token=xyz"));

        assert_eq!(session_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn cookie_token_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; token=xyz; lang=en"));

        assert_eq!(session_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn empty_cookie_is_no_session() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("token="));

        assert!(session_token(&headers).is_none());
    }

    #[test]
    fn cookie_flags() {
        let cookie = session_cookie("abc", 60, true);
        assert!(cookie.starts_with("token=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.ends_with("Secure"));
        assert!(expired_cookie(false).contains("Max-Age=0"));
    }
}
