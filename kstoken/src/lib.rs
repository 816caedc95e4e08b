//! Short-lived request tokens signed with a shared HMAC-SHA256 secret.
//!
//! A token binds a random nonce and an expiry deadline to the exact bytes of a
//! request body:
//!
//! ```text
//! <version>:<key id>.<base64(payload json)>.<base64(hmac_sha256(secret, base64(payload json) || body))>
//! ```
//!
//! ```
//! use kstoken::{KeyPair, TokenCodec};
//!
//! let key = KeyPair::new("k1", "s3cr3t").unwrap();
//! let codec = TokenCodec::new(key);
//!
//! let body = br#"{"query":"..."}"#;
//! let token = codec.issue(body).unwrap().to_string();
//! // "ks01:k1.eyJpYXQiOjE3...In0=.3m0o...="
//!
//! codec.verify(&token, body).unwrap();
//!
//! // any change to the body invalidates the token
//! let err = codec.verify(&token, br#"{"query":"..."} "#).unwrap_err();
//! assert!(matches!(err, kstoken::KsError::SignatureMismatch));
//! ```

#![forbid(unsafe_code)]

mod base64;
pub mod body;
pub mod clock;
pub mod codec;
pub mod config;
pub mod key;
pub mod payload;
pub mod request;
pub mod tokens;
mod validation;
pub mod version;

use std::time::Duration;

pub use body::RequestBody;
pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::{DEFAULT_TTL, TokenCodec};
pub use config::TokenConfig;
pub use key::{KeyId, KeyPair, Secret};
pub use payload::{ExpiryPayload, Nonce};
pub use request::SignedRequest;
pub use tokens::{SignedToken, VerifiedToken};
pub use version::Version;

#[derive(Debug)]
#[non_exhaustive]
/// Error returned for all token operations that can fail
pub enum KsError {
    /// The key id, secret or version tag is empty or cannot appear in a token.
    InvalidKey,
    /// The token was not of a valid form, or its payload could not be decoded.
    MalformedToken,
    /// The token was issued under a different protocol version.
    VersionMismatch,
    /// The token was issued for a different key id.
    KeyMismatch,
    /// The token deadline has passed.
    Expired,
    /// The token signature does not match the body.
    SignatureMismatch,
    /// A time-to-live could not be parsed or does not fit in a timestamp.
    InvalidDuration,
    /// The random source failed.
    CryptoError,
    /// A request body could not be serialized.
    PayloadError(serde_json::Error),
    /// Token settings could not be loaded.
    Config(::config::ConfigError),
}

impl std::error::Error for KsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KsError::PayloadError(x) => Some(x),
            KsError::Config(x) => Some(x),
            _ => None,
        }
    }
}

impl std::fmt::Display for KsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KsError::InvalidKey => f.write_str("key id, secret and version must be non-empty"),
            KsError::MalformedToken => f.write_str("Could not parse the token"),
            KsError::VersionMismatch => f.write_str("token version does not match expected"),
            KsError::KeyMismatch => f.write_str("key id of token does not match expected"),
            KsError::Expired => f.write_str("token is expired"),
            KsError::SignatureMismatch => f.write_str("Token signature could not be validated"),
            KsError::InvalidDuration => f.write_str("invalid token time-to-live"),
            KsError::CryptoError => f.write_str("random source unavailable"),
            KsError::PayloadError(x) => {
                write!(f, "there was an error with the body encoding: {x}")
            }
            KsError::Config(x) => write!(f, "could not load token settings: {x}"),
        }
    }
}

impl From<::config::ConfigError> for KsError {
    fn from(value: ::config::ConfigError) -> Self {
        KsError::Config(value)
    }
}

/// Issue a token for `body` that expires `ttl` from now.
pub fn issue(key: &KeyPair, body: &[u8], ttl: Duration) -> Result<SignedToken, KsError> {
    TokenCodec::new(key.clone()).issue_with_ttl(body, ttl)
}

/// Verify `token` against `key` and the exact `body` it was issued for.
pub fn verify(key: &KeyPair, token: &str, body: &[u8]) -> Result<VerifiedToken, KsError> {
    TokenCodec::new(key.clone()).verify(token, body)
}
