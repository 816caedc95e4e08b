//! Shared-secret key material.

use core::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::KsError;
use crate::version::Version;

type HmacSha256 = Hmac<Sha256>;

/// The identifier a token names its signing key by.
///
/// Key ids are written verbatim into the ASCII token header and read back after
/// `Bearer ` stripping and trimming, so they are limited to printable ASCII
/// other than `.`. Spaces, control characters and non-ASCII text are rejected
/// with [`KsError::InvalidKey`]; every id that is accepted round-trips.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KeyId(Box<str>);

impl KeyId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::str::FromStr for KeyId {
    type Err = KsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_header_segment(s, &['.']) {
            return Err(KsError::InvalidKey);
        }
        Ok(Self(s.into()))
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// The shared HMAC secret. Never printed.
#[derive(Clone)]
pub struct Secret(Box<[u8]>);

impl Secret {
    pub fn new(bytes: impl AsRef<[u8]>) -> Result<Self, KsError> {
        match bytes.as_ref() {
            [] => Err(KsError::InvalidKey),
            bytes => Ok(Self(bytes.into())),
        }
    }

    /// View the raw secret bytes.
    pub fn expose_secret(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

/// A key id and shared secret, plus the protocol version tokens are stamped with.
///
/// Both the key id and secret must be non-empty. The key id is embedded in the
/// token, the secret never is.
#[derive(Clone, Debug)]
pub struct KeyPair {
    key_id: KeyId,
    secret: Secret,
    version: Version,
}

impl KeyPair {
    pub fn new(key_id: impl AsRef<str>, secret: impl AsRef<[u8]>) -> Result<Self, KsError> {
        Ok(Self {
            key_id: key_id.as_ref().parse()?,
            secret: Secret::new(secret)?,
            version: Version::default(),
        })
    }

    /// Stamp and accept tokens of a different protocol version.
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn key_id(&self) -> &KeyId {
        &self.key_id
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    fn mac(&self, encoded_payload: &str, body: &[u8]) -> Result<HmacSha256, KsError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret.0).map_err(|_| KsError::InvalidKey)?;
        mac.update(encoded_payload.as_bytes());
        mac.update(body);
        Ok(mac)
    }

    /// `HMAC-SHA256(secret, encoded_payload || body)`
    pub(crate) fn sign(&self, encoded_payload: &str, body: &[u8]) -> Result<[u8; 32], KsError> {
        Ok(self.mac(encoded_payload, body)?.finalize().into_bytes().into())
    }

    /// Constant-time check of `tag` against the recomputed signature.
    pub(crate) fn verify(
        &self,
        encoded_payload: &str,
        body: &[u8],
        tag: &[u8],
    ) -> Result<(), KsError> {
        self.mac(encoded_payload, body)?
            .verify_slice(tag)
            .map_err(|_| KsError::SignatureMismatch)
    }
}

/// Key ids and version tags are written verbatim into the token header.
pub(crate) fn is_header_segment(s: &str, reserved: &[char]) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_graphic() && !reserved.contains(&c))
}
