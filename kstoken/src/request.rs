use std::sync::OnceLock;

use crate::KsError;
use crate::body::RequestBody;
use crate::clock::{Clock, SystemClock};
use crate::codec::TokenCodec;
use crate::tokens::SignedToken;

/// One outbound request: its body, and the single token issued for it.
///
/// The token is issued the first time it is asked for and then reused for the
/// lifetime of this value. Build a new `SignedRequest` for every request so a
/// nonce and deadline are never shared between bodies.
pub struct SignedRequest<'a, C = SystemClock> {
    codec: &'a TokenCodec<C>,
    body: RequestBody,
    token: OnceLock<SignedToken>,
}

impl<'a, C: Clock> SignedRequest<'a, C> {
    pub(crate) fn new(codec: &'a TokenCodec<C>, body: RequestBody) -> Self {
        Self {
            codec,
            body,
            token: OnceLock::new(),
        }
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// The token for this request, issued on first call.
    pub fn token(&self) -> Result<&SignedToken, KsError> {
        if let Some(token) = self.token.get() {
            return Ok(token);
        }
        let token = self.codec.issue(self.body.as_bytes())?;
        // a concurrent caller may have won the race, in which case theirs is kept
        Ok(self.token.get_or_init(|| token))
    }

    /// The `Authorization` header value for this request.
    pub fn authorization(&self) -> Result<String, KsError> {
        self.token().map(SignedToken::authorization)
    }

    pub fn into_parts(self) -> (RequestBody, Option<SignedToken>) {
        (self.body, self.token.into_inner())
    }
}
