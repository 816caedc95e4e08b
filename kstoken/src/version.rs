use core::fmt;
use std::borrow::Cow;

use crate::KsError;
use crate::key::is_header_segment;

/// The protocol tag at the front of every token.
///
/// Verification fails closed on any mismatch, so a change to the token format
/// ships under a new tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Version(Cow<'static, str>);

impl Version {
    /// The current token format.
    pub const KS01: Version = Version(Cow::Borrowed("ks01"));

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::KS01
    }
}

impl core::str::FromStr for Version {
    type Err = KsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_header_segment(s, &[':', '.']) {
            return Err(KsError::InvalidKey);
        }
        Ok(Self(Cow::Owned(s.to_owned())))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
