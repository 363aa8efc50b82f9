//! JWT authentication module.
//!
//! Verifies bearer tokens and turns them into an [`Actor`]. Tokens are
//! issued elsewhere; [`JwtManager::generate_access_token`] exists for
//! tooling and tests.
//!
//! ## Request Flow
//! ```text
//! Authorization: Bearer <jwt>
//!       │
//!       ▼
//! AuthUser extractor ──► JwtManager::validate_access_token
//!       │                      │
//!       │                      ├── bad signature / expired → 401
//!       │                      └── token_type != "access"  → 401
//!       ▼
//! Actor { user_id: sub, role }
//! ```

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;
use chairside_core::{Actor, Role};

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Role of the user at issue time
    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,

    /// Token type ("access")
    pub token_type: String,
}

impl Claims {
    /// The acting user these claims describe.
    pub fn actor(&self) -> Result<Actor, ApiError> {
        let user_id: i64 = self
            .sub
            .parse()
            .map_err(|_| ApiError::Unauthorized("Malformed token subject".to_string()))?;
        Ok(Actor::new(user_id, self.role))
    }
}

/// JWT token manager.
#[derive(Clone)]
pub struct JwtManager {
    secret: String,
    access_lifetime_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager.
    pub fn new(secret: String, access_lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            access_lifetime_secs,
        }
    }

    /// Generate an access token.
    pub fn generate_access_token(&self, user_id: i64, role: Role) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_lifetime_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: "access".to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::default();

        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| ApiError::Unauthorized(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    /// Validate that a token is an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = self.validate_token(token)?;

        if claims.token_type != "access" {
            return Err(ApiError::Unauthorized("Expected access token".to_string()));
        }

        Ok(claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// =============================================================================
// Extractors
// =============================================================================

/// The authenticated caller. Rejects with 401 when the token is missing or
/// invalid.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Actor);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| ApiError::Unauthorized("Invalid authorization header".to_string()))?;

        let claims = state.jwt.validate_access_token(token).map_err(|e| {
            warn!(uri = %parts.uri, error = %e, "Rejected bearer token");
            e
        })?;

        Ok(AuthUser(claims.actor()?))
    }
}

/// The caller if a valid token was sent. Public endpoints use this.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<Actor>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(MaybeAuthUser(None));
        }
        let AuthUser(actor) = AuthUser::from_request_parts(parts, state).await?;
        Ok(MaybeAuthUser(Some(actor)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret".to_string(), 3600);

        let token = manager.generate_access_token(7, Role::Staff).unwrap();
        let claims = manager.validate_access_token(&token).unwrap();

        assert_eq!(claims.sub, "7");
        assert_eq!(claims.role, Role::Staff);
        assert_eq!(claims.token_type, "access");

        let actor = claims.actor().unwrap();
        assert_eq!(actor.user_id, 7);
        assert_eq!(actor.role, Role::Staff);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtManager::new("one-secret".to_string(), 3600);
        let verifier = JwtManager::new("other-secret".to_string(), 3600);

        let token = issuer.generate_access_token(1, Role::Boss).unwrap();
        assert!(matches!(
            verifier.validate_access_token(&token),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = JwtManager::new("test-secret".to_string(), -3600);
        let token = manager.generate_access_token(1, Role::Boss).unwrap();
        assert!(manager.validate_access_token(&token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Basic xyz"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }
}
