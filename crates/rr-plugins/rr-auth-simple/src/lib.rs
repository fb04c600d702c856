//! # rr-auth-simple
//!
//! HMAC/JWT implementation of `AuthProvider`.
//! Confirmation codes are stateless: each one carries its issue time and a nonce
//! and is signed over the account's current state, so a code stops verifying
//! once the account logs in or changes its username or email.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rr_core::error::{AppError, Result};
use rr_core::models::{AccessClaims, User, UserId};
use rr_core::traits::AuthProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

type HmacSha256 = Hmac<sha2::Sha256>;

/// Hex characters of the MAC kept in a code.
const CODE_MAC_HEX: usize = 20;
const CODE_NONCE_BYTES: usize = 8;

pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;
pub const DEFAULT_CODE_TTL_SECS: i64 = 3 * 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id
    sub: String,
    username: String,
    iat: i64,
    exp: i64,
    jti: String,
}

pub struct SimpleAuthProvider {
    code_key: HmacSha256,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
    code_ttl: Duration,
}

impl SimpleAuthProvider {
    /// `secret` signs both confirmation codes and access tokens.
    pub fn new(secret: &str, token_ttl: Duration, code_ttl: Duration) -> Result<Self> {
        if secret.is_empty() {
            return Err(AppError::Internal("auth secret must not be empty".into()));
        }
        let code_key = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| AppError::Internal(format!("invalid auth secret: {}", e)))?;
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Ok(Self {
            code_key,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            token_ttl,
            code_ttl,
        })
    }

    fn code_mac(&self, user: &User, issued_at: i64, nonce: &str) -> HmacSha256 {
        let mut mac = self.code_key.clone();
        let last_login = user.last_login.map(|t| t.timestamp_micros()).unwrap_or_default();
        let state = format!(
            "{}|{}|{}|{}|{}|{}",
            user.id, user.username, user.email, last_login, issued_at, nonce
        );
        mac.update(state.as_bytes());
        mac
    }

    fn issue_code_at(&self, user: &User, now: DateTime<Utc>) -> String {
        let issued_at = now.timestamp();
        let nonce = hex::encode(rand::random::<[u8; CODE_NONCE_BYTES]>());
        let tag = hex::encode(self.code_mac(user, issued_at, &nonce).finalize().into_bytes());
        format!("{}-{}-{}", to_base36(issued_at as u64), nonce, &tag[..CODE_MAC_HEX])
    }

    fn verify_code_at(&self, user: &User, code: &str, now: DateTime<Utc>) -> bool {
        let mut parts = code.trim().splitn(3, '-');
        let (Some(issued), Some(nonce), Some(tag)) = (parts.next(), parts.next(), parts.next()) else {
            return false;
        };
        let Some(issued_at) = from_base36(issued).and_then(|v| i64::try_from(v).ok()) else {
            return false;
        };
        let age = now.timestamp() - issued_at;
        if age < 0 || age > self.code_ttl.num_seconds() {
            debug!(user_id = user.id, age, "confirmation code outside its validity window");
            return false;
        }
        if tag.len() != CODE_MAC_HEX {
            return false;
        }
        let Ok(tag) = hex::decode(tag) else {
            return false;
        };
        self.code_mac(user, issued_at, nonce).verify_truncated_left(&tag).is_ok()
    }

    fn issue_token_at(&self, user: &User, now: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, "failed to sign access token");
            AppError::Internal(format!("token signing failed: {}", e))
        })
    }
}

impl AuthProvider for SimpleAuthProvider {
    fn issue_confirmation_code(&self, user: &User) -> String {
        self.issue_code_at(user, Utc::now())
    }

    fn verify_confirmation_code(&self, user: &User, code: &str) -> bool {
        self.verify_code_at(user, code, Utc::now())
    }

    fn issue_access_token(&self, user: &User) -> Result<String> {
        self.issue_token_at(user, Utc::now())
    }

    fn verify_access_token(&self, token: &str) -> Result<AccessClaims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            debug!(error = %e, "rejected access token");
            AppError::Unauthorized("Given token not valid for any token type".into())
        })?;
        let user_id: UserId = data
            .claims
            .sub
            .parse()
            .map_err(|_| AppError::Unauthorized("Token contained no recognizable user identification".into()))?;
        Ok(AccessClaims { user_id, username: data.claims.username })
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".into();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

fn from_base36(raw: &str) -> Option<u64> {
    if raw.is_empty() {
        return None;
    }
    u64::from_str_radix(raw, 36).ok()
}
