use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{AppError, Result},
    models::{Actor, UserRole},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    /// Kept untyped so a malformed role degrades to "no role" instead of
    /// rejecting the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Value>,
    pub exp: usize,
}

impl Claims {
    pub fn role(&self) -> Option<UserRole> {
        UserRole::from_claim(self.role.as_ref())
    }
}

pub fn generate_token(
    secret: &str,
    user_id: i32,
    email: &str,
    role: Option<Value>,
) -> Result<String> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::days(30))
        .ok_or_else(|| AppError::InternalError("Failed to calculate expiration".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalError(format!("Token generation failed: {}", e)))
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

pub fn actor_from_claims(claims: &Claims) -> Result<Actor> {
    let id = claims
        .sub
        .parse::<i32>()
        .map_err(|_| AppError::Unauthorized("Unauthorized".to_string()))?;

    Ok(Actor::new(id, claims.email.clone(), claims.role()))
}
