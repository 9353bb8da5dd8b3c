use crate::config::AuthConfig;
use crate::error::AppError;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by the short-lived access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub exp: i64,
}

/// Claims carried by the refresh token. Only the user id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub exp: i64,
}

/// Identity fields copied into an access token.
pub struct TokenSubject<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub username: &'a str,
    pub full_name: &'a str,
}

pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// HS256 signing keys for both token kinds.
pub struct TokenKeys {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenKeys {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            access_ttl_secs: config.access_token_expiry_secs,
            refresh_ttl_secs: config.refresh_token_expiry_secs,
        }
    }

    pub fn issue_access(&self, subject: &TokenSubject<'_>) -> Result<String, AppError> {
        let claims = AccessClaims {
            sub: subject.id,
            email: subject.email.to_string(),
            username: subject.username.to_string(),
            full_name: subject.full_name.to_string(),
            exp: Utc::now().timestamp() + self.access_ttl_secs,
        };
        sign(&claims, &self.access_encoding)
    }

    pub fn issue_refresh(&self, user_id: Uuid) -> Result<String, AppError> {
        let claims = RefreshClaims {
            sub: user_id,
            exp: Utc::now().timestamp() + self.refresh_ttl_secs,
        };
        sign(&claims, &self.refresh_encoding)
    }

    pub fn issue_pair(&self, subject: &TokenSubject<'_>) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.issue_access(subject)?,
            refresh_token: self.issue_refresh(subject.id)?,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AppError> {
        decode::<AccessClaims>(token, &self.access_decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AppError::unauthorized(format!("Invalid access token: {e}")))
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AppError> {
        decode::<RefreshClaims>(token, &self.refresh_decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AppError::unauthorized(format!("Invalid refresh token: {e}")))
    }
}

fn sign<T: Serialize>(claims: &T, key: &EncodingKey) -> Result<String, AppError> {
    encode(&Header::default(), claims, key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign token: {e}")))
}
