//! Request signing for the trading API
//!
//! Every authenticated request carries `x-api-key`, `x-timestamp` and
//! `x-signature` headers. The signature is HMAC-SHA256 over the canonical
//! message `api_key + timestamp + path + method + body`, keyed with the
//! base64-decoded private key and emitted as base64. The server verifies
//! the exact byte sequence, so canonicalization is load-bearing.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{ApiError, ApiResult};

type HmacSha256 = Hmac<Sha256>;

/// API credentials: key id plus decoded private key material.
///
/// The key material is deliberately excluded from `Debug` output and is
/// never serialized.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    secret: Vec<u8>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from a key id and a base64-encoded private key.
    /// Fails with [`ApiError::InvalidKey`] on empty or malformed material.
    pub fn new(api_key: impl Into<String>, private_key_b64: &str) -> ApiResult<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ApiError::InvalidKey("api key is empty".into()));
        }
        let secret = BASE64
            .decode(private_key_b64.trim())
            .map_err(|e| ApiError::InvalidKey(format!("private key is not valid base64: {}", e)))?;
        if secret.is_empty() {
            return Err(ApiError::InvalidKey("private key is empty".into()));
        }
        Ok(Self { api_key, secret })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Sign one request. Deterministic over its inputs.
    pub fn sign(&self, timestamp: i64, method: &str, path: &str, body: &str) -> String {
        let message = canonical_message(&self.api_key, timestamp, method, path, body);
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(message.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }

    /// Signed headers for one request
    pub fn auth_headers(
        &self,
        timestamp: i64,
        method: &str,
        path: &str,
        body: &str,
    ) -> [(&'static str, String); 3] {
        [
            ("x-api-key", self.api_key.clone()),
            ("x-timestamp", timestamp.to_string()),
            ("x-signature", self.sign(timestamp, method, path, body)),
        ]
    }
}

/// The exact byte sequence the server verifies
pub fn canonical_message(
    api_key: &str,
    timestamp: i64,
    method: &str,
    path: &str,
    body: &str,
) -> String {
    format!("{}{}{}{}{}", api_key, timestamp, path, method, body)
}
