//! The token wire form.

use core::fmt;

use jiff::Timestamp;

use crate::KsError;
use crate::key::KeyPair;
use crate::payload::ExpiryPayload;
use crate::validation::{PlausibleExpiry, Time, Validate};

/// A signed token, as issued or as received.
///
/// Parsing only checks the token's shape. The payload and signature stay in
/// their encoded form until [`SignedToken::verify`] checks them against a key
/// and the request body.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedToken {
    version: Box<str>,
    key_id: Box<str>,
    payload: Box<str>,
    signature: Box<str>,
}

/// A [`SignedToken`] whose key, payload and signature have been checked.
#[derive(Clone, Debug)]
pub struct VerifiedToken {
    /// The payload that was signed
    pub payload: ExpiryPayload,
    token: SignedToken,
}

impl VerifiedToken {
    pub fn token(&self) -> &SignedToken {
        &self.token
    }
}

impl SignedToken {
    /// Sign `payload` together with `body`.
    pub fn sign(key: &KeyPair, payload: &ExpiryPayload, body: &[u8]) -> Result<Self, KsError> {
        let payload = payload.encode()?;
        let signature = key.sign(&payload, body)?;

        Ok(Self {
            version: key.version().as_str().into(),
            key_id: key.key_id().as_str().into(),
            signature: crate::base64::encode(&signature).into(),
            payload: payload.into(),
        })
    }

    /// The **unverified** version tag
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The **unverified** key id
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// `Bearer <token>`, for the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("Bearer {self}")
    }

    /// Check the token was issued by `key` for exactly `body`, and that its
    /// deadline is still ahead of `now`.
    ///
    /// Checks run in order and stop at the first failure: version, key id,
    /// payload decoding, the plausibility floor, expiry, then the signature.
    pub fn verify(
        self,
        key: &KeyPair,
        body: &[u8],
        now: Timestamp,
    ) -> Result<VerifiedToken, KsError> {
        if *self.version != *key.version().as_str() {
            return Err(KsError::VersionMismatch);
        }
        if *self.key_id != *key.key_id().as_str() {
            return Err(KsError::KeyMismatch);
        }

        let payload = ExpiryPayload::decode(&self.payload)?;
        PlausibleExpiry.then(Time::valid_at(now)).validate(&payload)?;

        let signature = crate::base64::decode(&self.signature)?;
        key.verify(&self.payload, body, &signature)?;

        Ok(VerifiedToken {
            payload,
            token: self,
        })
    }
}

impl fmt::Display for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.version)?;
        f.write_str(":")?;
        f.write_str(&self.key_id)?;
        f.write_str(".")?;
        f.write_str(&self.payload)?;
        f.write_str(".")?;
        f.write_str(&self.signature)
    }
}

impl fmt::Debug for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedToken")
            .field("version", &self.version)
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl core::str::FromStr for SignedToken {
    type Err = KsError;

    /// Accepts the bare token or an `Authorization` value with a `Bearer ` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("Bearer ").map_or(s, str::trim_start);

        let mut parts = s.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(KsError::MalformedToken);
        };
        let (version, key_id) = header.split_once(':').ok_or(KsError::MalformedToken)?;

        Ok(Self {
            version: version.into(),
            key_id: key_id.into(),
            payload: payload.into(),
            signature: signature.into(),
        })
    }
}
