//! Checks run against a token's payload before its signature.

use jiff::Timestamp;

use crate::KsError;
use crate::payload::{ExpiryPayload, MIN_PLAUSIBLE_EXPIRY};

pub(crate) trait Validate {
    /// The validation to perform on the payload
    fn validate(&self, payload: &ExpiryPayload) -> Result<(), KsError>;

    /// Extend the validation with another validation.
    fn then<V>(self, other: V) -> impl Validate
    where
        Self: Sized,
        V: Validate,
    {
        ValidateThen(self, other)
    }
}

/// Rejects deadlines too small to be real epoch timestamps.
pub(crate) struct PlausibleExpiry;

impl Validate for PlausibleExpiry {
    fn validate(&self, payload: &ExpiryPayload) -> Result<(), KsError> {
        if payload.expires_at < MIN_PLAUSIBLE_EXPIRY {
            return Err(KsError::MalformedToken);
        }
        Ok(())
    }
}

/// Rejects tokens whose deadline has been reached.
pub(crate) struct Time {
    now: Timestamp,
}

impl Time {
    pub(crate) fn valid_at(now: Timestamp) -> Self {
        Self { now }
    }
}

impl Validate for Time {
    fn validate(&self, payload: &ExpiryPayload) -> Result<(), KsError> {
        if self.now.as_second() >= payload.expires_at {
            return Err(KsError::Expired);
        }
        Ok(())
    }
}

struct ValidateThen<T, U>(T, U);

impl<T: Validate, U: Validate> Validate for ValidateThen<T, U> {
    fn validate(&self, payload: &ExpiryPayload) -> Result<(), KsError> {
        self.0.validate(payload)?;
        self.1.validate(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Nonce;

    fn expiring_at(expires_at: i64) -> ExpiryPayload {
        ExpiryPayload {
            expires_at,
            nonce: Nonce::from_bytes([0; 6]),
        }
    }

    fn at(second: i64) -> Time {
        Time::valid_at(Timestamp::from_second(second).unwrap())
    }

    #[test]
    fn deadline_is_exclusive() {
        let payload = expiring_at(1_700_000_000);
        at(1_699_999_999).validate(&payload).unwrap();
        assert!(matches!(
            at(1_700_000_000).validate(&payload),
            Err(KsError::Expired)
        ));
        assert!(matches!(
            at(1_700_000_001).validate(&payload),
            Err(KsError::Expired)
        ));
    }

    #[test]
    fn implausible_deadline_is_malformed() {
        PlausibleExpiry.validate(&expiring_at(9999)).unwrap();
        assert!(matches!(
            PlausibleExpiry.validate(&expiring_at(9998)),
            Err(KsError::MalformedToken)
        ));
        assert!(matches!(
            PlausibleExpiry.validate(&expiring_at(-1)),
            Err(KsError::MalformedToken)
        ));
    }

    #[test]
    fn chain_reports_first_failure() {
        // both checks fail, the floor check runs first
        let chain = PlausibleExpiry.then(at(1_700_000_000));
        assert!(matches!(
            chain.validate(&expiring_at(5)),
            Err(KsError::MalformedToken)
        ));

        let chain = PlausibleExpiry.then(at(1_700_000_000));
        chain.validate(&expiring_at(1_700_000_001)).unwrap();
        assert!(matches!(
            chain.validate(&expiring_at(1_700_000_000)),
            Err(KsError::Expired)
        ));
    }
}
