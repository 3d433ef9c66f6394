//! Authentication
//!
//! Requests carry a bearer JWT whose subject is the user id and whose
//! `role` claim is one of the workflow roles. The verified token becomes the
//! [`Actor`] every engine call is made with.

use std::str::FromStr;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::UserId;
use domain_warranty::{Actor, Role};

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Workflow role of the user
    pub role: String,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

impl Claims {
    /// Resolves the acting user
    pub fn actor(&self) -> Result<Actor, AuthError> {
        let id = UserId::from_str(&self.sub).map_err(|_| AuthError::InvalidSubject)?;
        let role = Role::from_str(&self.role).map_err(|_| AuthError::UnknownRole(self.role.clone()))?;
        Ok(Actor::new(id, role))
    }
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Token subject is not a user id")]
    InvalidSubject,
    #[error("Unknown role: {0}")]
    UnknownRole(String),
}

/// Creates a signed token for `actor`
pub fn create_token(actor: &Actor, secret: &str, expiration_secs: u64) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(i64::try_from(expiration_secs).unwrap_or(i64::MAX / 1000));

    let claims = Claims {
        sub: actor.id.as_uuid().to_string(),
        role: actor.role.as_str().to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a JWT token
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Verifies a token and resolves its actor
pub fn authenticate(token: &str, secret: &str) -> Result<Actor, AuthError> {
    validate_token(token, secret)?.actor()
}
