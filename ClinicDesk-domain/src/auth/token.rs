use std::env;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::auth::token_blacklist;
use crate::auth::Claims;

/// Security errors for authentication and token operations
#[derive(Debug, Error)]
pub enum SecurityError {
    /// JWT validation error
    #[error("Token validation error: {0}")]
    TokenValidation(String),

    /// Expired token
    #[error("Token has expired")]
    TokenExpired,

    /// Invalid token structure
    #[error("Invalid token format")]
    InvalidToken,

    /// Configuration error
    #[error("Security configuration error: {0}")]
    ConfigError(String),

    /// Token has been revoked
    #[error("Token has been revoked")]
    TokenRevoked,

    /// Token of the wrong type for this use
    #[error("Expected a {expected} token")]
    WrongTokenType { expected: TokenType },

    /// Invalid issuer
    #[error("Invalid token issuer")]
    InvalidIssuer,
}

/// Token types for authentication
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived access token
    Access,
    /// Long-lived refresh token
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Access => write!(f, "access"),
            TokenType::Refresh => write!(f, "refresh"),
        }
    }
}

impl TokenType {
    /// Get the expiration duration for this token type
    pub fn expiration(&self) -> Duration {
        match self {
            TokenType::Access => {
                let expiration_minutes = env::var("ACCESS_TOKEN_EXPIRATION_MINUTES")
                    .unwrap_or_else(|_| "15".to_string())
                    .parse::<i64>()
                    .unwrap_or(15);

                Duration::minutes(expiration_minutes)
            }
            TokenType::Refresh => {
                let expiration_days = env::var("REFRESH_TOKEN_EXPIRATION_DAYS")
                    .unwrap_or_else(|_| "7".to_string())
                    .parse::<i64>()
                    .unwrap_or(7);

                Duration::days(expiration_days)
            }
        }
    }
}

/// Who a token is issued to
#[derive(Debug, Clone)]
pub struct TokenSubject<'a> {
    pub user_id: &'a str,
    pub username: &'a str,
    pub roles: &'a [String],
}

fn jwt_secret() -> Result<String, SecurityError> {
    env::var("JWT_SECRET").map_err(|e| {
        error!("JWT_SECRET environment variable not found: {}", e);
        SecurityError::ConfigError("JWT_SECRET environment variable not found".to_string())
    })
}

fn jwt_issuer() -> String {
    env::var("JWT_ISSUER").unwrap_or_else(|_| "clinic-desk-api".to_string())
}

/// Generate a new JWT token with a fresh `jti`
pub fn generate_token(subject: &TokenSubject<'_>, token_type: TokenType) -> Result<String, SecurityError> {
    let jwt_secret = jwt_secret()?;

    let now = Utc::now();
    let expiration = now + token_type.expiration();

    let claims = Claims {
        sub: subject.user_id.to_string(),
        iss: jwt_issuer(),
        iat: now.timestamp(),
        exp: expiration.timestamp(),
        jti: Uuid::new_v4().to_string(),
        token_type,
        username: subject.username.to_string(),
        roles: subject.roles.to_vec(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        error!("Failed to encode JWT token: {}", e);
        SecurityError::TokenValidation(e.to_string())
    })?;

    // Never log the token itself
    info!("Generated {} token for user {}", token_type, subject.user_id);
    debug!("Token expiration: {}", expiration);

    Ok(token)
}

/// Validate a JWT token and return the decoded claims
pub fn validate_token(token: &str) -> Result<Claims, SecurityError> {
    let jwt_secret = jwt_secret()?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;
    validation.set_issuer(&[jwt_issuer()]);

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(jwt_secret.as_bytes()), &validation)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => SecurityError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidToken => SecurityError::InvalidToken,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => SecurityError::InvalidIssuer,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                SecurityError::TokenValidation("Invalid signature".to_string())
            }
            _ => SecurityError::TokenValidation(e.to_string()),
        })?;

    if is_token_revoked(&token_data.claims.jti) {
        return Err(SecurityError::TokenRevoked);
    }

    Ok(token_data.claims)
}

/// Validate a token and require it to be of `expected` type
pub fn validate_token_of_type(token: &str, expected: TokenType) -> Result<Claims, SecurityError> {
    let claims = validate_token(token)?;
    if claims.token_type != expected {
        return Err(SecurityError::WrongTokenType { expected });
    }
    Ok(claims)
}

fn is_token_revoked(jti: &str) -> bool {
    let is_revoked = token_blacklist::blacklist().is_revoked(jti);
    debug!("Checking if token {} is revoked: {}", jti, is_revoked);
    is_revoked
}

/// Revoke one token until it would have expired anyway
pub fn revoke_token(claims: &Claims) {
    info!("Revoking {} token {} for user {}", claims.token_type, claims.jti, claims.sub);

    let keep_until = claims.exp.max(Utc::now().timestamp() + 60);
    token_blacklist::blacklist().revoke(&claims.jti, keep_until);
}

/// Environment shared by every test that issues or checks tokens
#[cfg(test)]
pub(crate) fn set_test_env() {
    std::env::set_var("JWT_SECRET", "test_secret_key_for_testing_only");
    std::env::remove_var("JWT_ISSUER");
}
