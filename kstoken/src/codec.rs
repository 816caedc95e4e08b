use std::time::Duration;

use rand_core::TryCryptoRng;

use crate::KsError;
use crate::body::RequestBody;
use crate::clock::{Clock, SystemClock};
use crate::key::KeyPair;
use crate::payload::{ExpiryPayload, Nonce};
use crate::request::SignedRequest;
use crate::tokens::{SignedToken, VerifiedToken};

/// How long an issued token stays valid unless told otherwise.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3 * 60 * 60);

/// Issues and verifies tokens for one key.
///
/// Holds no mutable state: `issue` and `verify` can be called concurrently
/// from any number of threads.
#[derive(Clone, Debug)]
pub struct TokenCodec<C = SystemClock> {
    key: KeyPair,
    ttl: Duration,
    clock: C,
}

impl TokenCodec {
    pub fn new(key: KeyPair) -> Self {
        Self {
            key,
            ttl: DEFAULT_TTL,
            clock: SystemClock,
        }
    }
}

impl<C: Clock> TokenCodec<C> {
    /// Read the time from `clock` instead of the system clock.
    pub fn with_clock<D: Clock>(self, clock: D) -> TokenCodec<D> {
        TokenCodec {
            key: self.key,
            ttl: self.ttl,
            clock,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn key(&self) -> &KeyPair {
        &self.key
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `body` with the default time-to-live.
    pub fn issue(&self, body: &[u8]) -> Result<SignedToken, KsError> {
        self.issue_with_ttl(body, self.ttl)
    }

    pub fn issue_with_ttl(&self, body: &[u8], ttl: Duration) -> Result<SignedToken, KsError> {
        self.issue_with_nonce(body, ttl, Nonce::random()?)
    }

    /// Issue a token drawing its nonce from `rng`.
    pub fn issue_with_rng(
        &self,
        body: &[u8],
        ttl: Duration,
        rng: impl TryCryptoRng,
    ) -> Result<SignedToken, KsError> {
        self.issue_with_nonce(body, ttl, Nonce::from_rng(rng)?)
    }

    fn issue_with_nonce(
        &self,
        body: &[u8],
        ttl: Duration,
        nonce: Nonce,
    ) -> Result<SignedToken, KsError> {
        let deadline = self
            .clock
            .now()
            .checked_add(ttl)
            .map_err(|_| KsError::InvalidDuration)?;
        let payload = ExpiryPayload::new(deadline, nonce);
        let token = SignedToken::sign(&self.key, &payload, body)?;

        tracing::trace!(
            key_id = %self.key.key_id(),
            expires_at = payload.expires_at,
            "issued token"
        );
        Ok(token)
    }

    /// Verify `token` against this codec's key, the current time and `body`.
    ///
    /// `token` may carry a `Bearer ` prefix. `body` must be byte-identical to
    /// the body the token was issued for.
    pub fn verify(&self, token: &str, body: &[u8]) -> Result<VerifiedToken, KsError> {
        token
            .parse::<SignedToken>()
            .and_then(|token| token.verify(&self.key, body, self.clock.now()))
            .inspect_err(|err| {
                tracing::debug!(key_id = %self.key.key_id(), reason = %err, "rejected token");
            })
    }

    /// Wrap `body` so exactly one token is issued for it, on first use.
    pub fn request(&self, body: impl Into<RequestBody>) -> SignedRequest<'_, C> {
        SignedRequest::new(self, body.into())
    }
}
