//! Fixtures shared by the token test suites: the JSON vector format, and a
//! random source that replays the nonce a vector was issued with.

use core::fmt;

use jiff::Timestamp;
use kstoken::{FixedClock, KeyPair, KsError, Nonce, TokenCodec};
use rand::rand_core::{TryCryptoRng, TryRngCore};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct VectorFile {
    pub name: String,
    pub tests: Vec<Vector>,
}

impl VectorFile {
    /// Load `tests/vectors/{file}` of the crate under test.
    pub fn load(file: &str) -> Self {
        let path = format!("tests/vectors/{file}");
        let json = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{path}: {e}"));
        serde_json::from_str(&json).unwrap_or_else(|e| panic!("{path}: {e}"))
    }
}

/// A token, the key and body it belongs to, and what verifying it must yield.
#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Vector {
    pub name: String,
    pub expect_fail: bool,
    pub key_id: String,
    pub secret: String,
    pub version: String,
    pub body: String,
    /// Epoch second the token is presented at
    pub verify_at: i64,
    pub token: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub enum Outcome {
    /// Issued at `now` for `ttl` seconds, with `nonce`. Must verify.
    Issued { nonce: Nonce, now: i64, ttl: u64 },
    /// Must be rejected for `reason`.
    Rejected { reason: Reason, comment: String },
}

impl Vector {
    pub fn key_pair(&self) -> Result<KeyPair, KsError> {
        Ok(KeyPair::new(&self.key_id, &self.secret)?.with_version(self.version.parse()?))
    }

    /// A codec for this vector's key whose clock reads `second`.
    pub fn codec_at(&self, second: i64) -> Result<TokenCodec<FixedClock>, KsError> {
        let now = Timestamp::from_second(second).expect("vector time out of range");
        Ok(TokenCodec::new(self.key_pair()?).with_clock(FixedClock::new(now)))
    }
}

/// Why a token is rejected, as named in the vectors.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Reason {
    Malformed,
    VersionMismatch,
    KeyMismatch,
    Expired,
    SignatureMismatch,
}

impl Reason {
    /// The reason `err` stands for, if it is a verification failure.
    pub fn of(err: &KsError) -> Option<Self> {
        match err {
            KsError::MalformedToken => Some(Reason::Malformed),
            KsError::VersionMismatch => Some(Reason::VersionMismatch),
            KsError::KeyMismatch => Some(Reason::KeyMismatch),
            KsError::Expired => Some(Reason::Expired),
            KsError::SignatureMismatch => Some(Reason::SignatureMismatch),
            _ => None,
        }
    }
}

/// Hands out a single fixed nonce, then runs dry.
///
/// Anything other than one nonce-sized fill fails, which surfaces from
/// issuance as [`KsError::CryptoError`].
#[derive(Clone, Debug)]
pub struct NonceRng(Option<Nonce>);

#[derive(Debug)]
pub struct Exhausted;

impl fmt::Display for Exhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("nonce already drawn")
    }
}

impl std::error::Error for Exhausted {}

impl NonceRng {
    pub fn new(nonce: Nonce) -> Self {
        Self(Some(nonce))
    }
}

impl TryRngCore for NonceRng {
    type Error = Exhausted;

    fn try_next_u32(&mut self) -> Result<u32, Exhausted> {
        Err(Exhausted)
    }

    fn try_next_u64(&mut self) -> Result<u64, Exhausted> {
        Err(Exhausted)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Exhausted> {
        match self.0.take() {
            Some(nonce) if dest.len() == Nonce::LEN => {
                dest.copy_from_slice(nonce.as_bytes());
                Ok(())
            }
            _ => Err(Exhausted),
        }
    }
}

// deterministic, for tests only
impl TryCryptoRng for NonceRng {}
