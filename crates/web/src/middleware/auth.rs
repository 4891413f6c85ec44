//! Bearer-token authentication.
//!
//! End users and admins are two separate trust domains. User tokens come
//! from the external identity provider and are checked against its public
//! key; admin tokens are HS256 tokens signed with our own secret. Each
//! verifier only ever accepts its own kind of token.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::error::WebError;

const ADMIN_ROLE: &str = "admin";

fn bearer_token(headers: &HeaderMap) -> Result<&str, WebError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| WebError::Unauthorized("Authentication required".into()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| WebError::Unauthorized("Invalid authorization header".into()))
}

/// Claims we read from identity-provider tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UserClaims {
    fn display_name(&self) -> String {
        self.username
            .as_ref()
            .or(self.nickname.as_ref())
            .or(self.name.as_ref())
            .cloned()
            .unwrap_or_else(|| self.sub.clone())
    }
}

pub struct UserTokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl UserTokenVerifier {
    /// Verifier for RS256 tokens signed by the identity provider.
    pub fn from_rsa_pem(
        pem: &[u8],
        issuer: Option<&str>,
        audience: Option<&str>,
    ) -> anyhow::Result<Self> {
        let key = DecodingKey::from_rsa_pem(pem)?;
        let mut validation = Validation::new(Algorithm::RS256);

        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        match audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Ok(Self { key, validation })
    }

    /// HS256 verifier, for local development and tests.
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<UserClaims, WebError> {
        decode::<UserClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Rejected user token: {}", e);
                WebError::Unauthorized("Invalid or expired token".into())
            })
    }
}

/// Authenticated end user, extracted from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    Arc<UserTokenVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let verifier = Arc::<UserTokenVerifier>::from_ref(state);
        let claims = verifier.verify(token)?;

        Ok(AuthUser {
            username: claims.display_name(),
            user_id: claims.sub,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

pub struct AdminTokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl AdminTokenVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<AdminClaims, WebError> {
        let claims = decode::<AdminClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!("Invalid admin token attempt: {}", e);
                WebError::Unauthorized("Invalid or expired admin token".into())
            })?;

        if claims.role != ADMIN_ROLE {
            tracing::warn!(sub = %claims.sub, role = %claims.role, "Non-admin token on admin route");
            return Err(WebError::Unauthorized("Admin access required".into()));
        }

        Ok(claims)
    }
}

/// Route layer guarding the admin API.
pub async fn require_admin(
    State(verifier): State<Arc<AdminTokenVerifier>>,
    mut req: Request,
    next: Next,
) -> Result<Response, WebError> {
    let claims = verifier.verify(bearer_token(req.headers())?)?;
    tracing::debug!(admin = %claims.sub, "Admin request authorized");

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
pub mod testing {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;

    pub const USER_SECRET: &[u8] = b"user-test-secret";
    pub const ADMIN_SECRET: &[u8] = b"admin-test-secret";

    fn expiry() -> usize {
        (Utc::now() + Duration::hours(1)).timestamp() as usize
    }

    pub fn user_token(user_id: &str, username: &str) -> String {
        let claims = UserClaims {
            sub: user_id.to_string(),
            exp: expiry(),
            username: None,
            nickname: Some(username.to_string()),
            name: None,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(USER_SECRET),
        )
        .unwrap()
    }

    pub fn admin_token_with_role(role: &str) -> String {
        let claims = AdminClaims {
            sub: "admin@pixelpost".to_string(),
            role: role.to_string(),
            exp: expiry(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(ADMIN_SECRET),
        )
        .unwrap()
    }

    pub fn admin_token() -> String {
        admin_token_with_role(ADMIN_ROLE)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn user_token_resolves_identity() {
        let verifier = UserTokenVerifier::from_secret(USER_SECRET);
        let claims = verifier.verify(&user_token("auth0|42", "pixelfan")).unwrap();

        assert_eq!(claims.sub, "auth0|42");
        assert_eq!(claims.display_name(), "pixelfan");
    }

    #[test]
    fn trust_domains_do_not_mix() {
        let users = UserTokenVerifier::from_secret(USER_SECRET);
        let admins = AdminTokenVerifier::new(ADMIN_SECRET);

        assert!(users.verify(&admin_token()).is_err());
        assert!(admins.verify(&user_token("auth0|42", "pixelfan")).is_err());
    }

    #[test]
    fn admin_token_requires_admin_role() {
        let admins = AdminTokenVerifier::new(ADMIN_SECRET);

        assert!(admins.verify(&admin_token()).is_ok());
        assert!(admins.verify(&admin_token_with_role("moderator")).is_err());
    }

    #[test]
    fn bearer_prefix_is_required() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, "Token abc".parse().unwrap());
        assert!(bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), "abc");
    }
}
