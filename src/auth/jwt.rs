//! JWT token issue and validation
//!
//! HS256 tokens carrying the account id and role. Validation rejects
//! expired tokens, malformed claims, and ids that do not parse back to
//! an ObjectId.

use bson::oid::ObjectId;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::{Principal, Role};
use crate::types::{Result, WaysideError};

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id (ObjectId hex)
    pub sub: String,
    /// Account identifier (email), for logs and /auth/me
    pub identifier: String,
    /// Account role
    pub role: Role,
    /// Issued at (unix seconds)
    pub iat: u64,
    /// Expiry (unix seconds)
    pub exp: u64,
}

/// Issues and validates tokens with a shared secret
#[derive(Clone)]
pub struct JwtValidator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_seconds: u64,
}

impl JwtValidator {
    pub fn new(secret: &str, expiry_seconds: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        }
    }

    /// Issue a token for an account. Returns the token and its expiry
    /// timestamp (unix seconds).
    pub fn issue(&self, account_id: ObjectId, identifier: &str, role: Role) -> Result<(String, u64)> {
        let now = unix_now();
        let exp = now + self.expiry_seconds;

        let claims = Claims {
            sub: account_id.to_hex(),
            identifier: identifier.to_string(),
            role,
            iat: now,
            exp,
        };

        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| WaysideError::Auth(format!("Failed to sign token: {}", e)))?;

        Ok((token, exp))
    }

    /// Validate a token and resolve the principal it names
    pub fn validate(&self, token: &str) -> Result<Principal> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|e| WaysideError::Auth(format!("Invalid token: {}", e)))?;

        let account_id = ObjectId::parse_str(&data.claims.sub)
            .map_err(|_| WaysideError::Auth("Token subject is not a valid id".into()))?;

        Ok(Principal {
            account_id,
            identifier: data.claims.identifier,
            role: data.claims.role,
        })
    }
}

/// Extract the bearer token from an Authorization header value
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
