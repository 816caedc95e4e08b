//! The signed JSON payload: an expiry deadline and a per-token nonce.
//!
//! On the wire the payload is `{"iat":<epoch seconds>,"nonce":"<12 hex chars>"}`.
//! Despite the key name, `iat` holds the deadline after which the token is no
//! longer accepted, not the time it was issued.

use core::fmt;

use jiff::Timestamp;
use rand_core::TryCryptoRng;
use serde::de::Visitor;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::KsError;

/// Deadlines below this are treated as garbage rather than as long-expired tokens.
pub const MIN_PLAUSIBLE_EXPIRY: i64 = 9999;

/// Random bytes making every issued token unique.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Nonce([u8; Nonce::LEN]);

impl Nonce {
    pub const LEN: usize = 6;

    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    /// Draw a nonce from the operating system.
    pub fn random() -> Result<Self, KsError> {
        let mut bytes = [0; Self::LEN];
        getrandom::fill(&mut bytes).map_err(|_| KsError::CryptoError)?;
        Ok(Self(bytes))
    }

    pub fn from_rng(mut rng: impl TryCryptoRng) -> Result<Self, KsError> {
        let mut bytes = [0; Self::LEN];
        rng.try_fill_bytes(&mut bytes)
            .map_err(|_| KsError::CryptoError)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce({self})")
    }
}

impl core::str::FromStr for Nonce {
    type Err = KsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0; Self::LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| KsError::MalformedToken)?;
        Ok(Self(bytes))
    }
}

impl Serialize for Nonce {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Nonce {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct NonceVisitor;

        impl Visitor<'_> for NonceVisitor {
            type Value = Nonce;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{} hex encoded bytes", Nonce::LEN)
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse().map_err(E::custom)
            }
        }

        d.deserialize_str(NonceVisitor)
    }
}

/// The claims carried by every token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryPayload {
    /// Epoch seconds. The token is rejected from this instant on.
    #[serde(rename = "iat")]
    pub expires_at: i64,
    pub nonce: Nonce,
}

impl ExpiryPayload {
    pub fn new(expires_at: Timestamp, nonce: Nonce) -> Self {
        Self {
            expires_at: expires_at.as_second(),
            nonce,
        }
    }

    /// The deadline as a timestamp, if it is within jiff's supported range.
    pub fn deadline(&self) -> Option<Timestamp> {
        Timestamp::from_second(self.expires_at).ok()
    }

    /// Compact JSON, base64 encoded. This exact text is what gets signed.
    pub(crate) fn encode(&self) -> Result<String, KsError> {
        let json = serde_json::to_vec(self).map_err(KsError::PayloadError)?;
        Ok(crate::base64::encode(&json))
    }

    pub(crate) fn decode(encoded: &str) -> Result<Self, KsError> {
        let json = crate::base64::decode(encoded)?;
        serde_json::from_slice(&json).map_err(|_| KsError::MalformedToken)
    }
}
