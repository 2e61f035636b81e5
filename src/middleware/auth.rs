use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::header};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{Role, User},
    state::AppState,
};

/// Caller identity resolved from the bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub phone_number: Option<String>,
    pub admin: bool,
}

impl AuthUser {
    pub fn owns(&self, owner_id: &str) -> bool {
        self.uid == owner_id
    }
}

pub fn ensure_admin(user: &AuthUser) -> AppResult<()> {
    if !user.admin {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_owner_or_admin(user: &AuthUser, owner_id: &str) -> AppResult<()> {
    if user.admin || user.owns(owner_id) {
        return Ok(());
    }
    Err(AppError::Forbidden)
}

/// Turns bearer credentials into identities and back.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn verify(&self, token: &str) -> AppResult<AuthUser>;

    async fn issue(&self, user: &User) -> AppResult<String>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub admin: bool,
    pub exp: usize,
}

pub struct JwtAuthorizer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    session: Duration,
}

impl JwtAuthorizer {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            session: Duration::days(30),
        }
    }

    pub fn sign(&self, claims: &Claims) -> AppResult<String> {
        encode(&Header::default(), claims, &self.encoding)
            .map_err(|err| AppError::Internal(anyhow::anyhow!("failed to sign token: {err}")))
    }
}

#[async_trait]
impl Authorizer for JwtAuthorizer {
    async fn verify(&self, token: &str) -> AppResult<AuthUser> {
        let decoded = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|err| {
                tracing::debug!(error = %err, "rejected bearer token");
                AppError::Unauthorized
            })?;
        let claims = decoded.claims;
        if claims.sub.is_empty() {
            return Err(AppError::Unauthorized);
        }
        Ok(AuthUser {
            uid: claims.sub,
            phone_number: claims.phone_number,
            admin: claims.admin,
        })
    }

    async fn issue(&self, user: &User) -> AppResult<String> {
        let exp = (Utc::now() + self.session).timestamp() as usize;
        self.sign(&Claims {
            sub: user.uid.clone(),
            phone_number: user.phone_number.clone(),
            admin: user.role == Role::Admin,
            exp,
        })
    }
}

fn bearer(parts: &axum::http::request::Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer(parts).ok_or(AppError::Unauthorized)?;
        state.authorizer.verify(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        let now = Utc::now();
        User {
            uid: "u1".into(),
            phone_number: Some("+911234567890".into()),
            role,
            profile: Default::default(),
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }

    #[tokio::test]
    async fn issued_tokens_verify_with_role() {
        let auth = JwtAuthorizer::new("secret");
        let token = auth.issue(&user(Role::Admin)).await.unwrap();
        let caller = auth.verify(&token).await.unwrap();
        assert_eq!(caller.uid, "u1");
        assert!(caller.admin);
        assert_eq!(caller.phone_number.as_deref(), Some("+911234567890"));
    }

    #[tokio::test]
    async fn foreign_tokens_are_unauthorized() {
        let token = JwtAuthorizer::new("one")
            .issue(&user(Role::User))
            .await
            .unwrap();
        let err = JwtAuthorizer::new("two").verify(&token).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[test]
    fn ownership_checks() {
        let caller = AuthUser {
            uid: "u1".into(),
            phone_number: None,
            admin: false,
        };
        assert!(ensure_owner_or_admin(&caller, "u1").is_ok());
        assert!(matches!(
            ensure_owner_or_admin(&caller, "u2"),
            Err(AppError::Forbidden)
        ));
        assert!(ensure_admin(&caller).is_err());
    }
}
