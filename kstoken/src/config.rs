//! Deployment settings for a [`TokenCodec`].
//!
//! # Supported Environment Variables
//!
//! - `KSTOKEN_KEY_ID`: key id stamped into issued tokens (required)
//! - `KSTOKEN_SECRET`: shared HMAC secret (required)
//! - `KSTOKEN_VERSION`: protocol version tag, default `ks01`
//! - `KSTOKEN_TTL`: ISO 8601 duration tokens stay valid for, default `PT3H`

use core::fmt;
use std::path::Path;
use std::time::Duration;

use ::config::builder::DefaultState;
use ::config::{ConfigBuilder, Environment, File};
use jiff::{Span, SpanRelativeTo};
use serde::Deserialize;

use crate::KsError;
use crate::codec::TokenCodec;
use crate::key::KeyPair;
use crate::version::Version;

#[derive(Clone, Deserialize)]
pub struct TokenConfig {
    pub key_id: String,
    pub secret: String,
    pub version: String,
    /// ISO 8601 duration, e.g. `PT3H`
    pub ttl: String,
}

impl TokenConfig {
    /// A configuration builder holding the defaults.
    ///
    /// ```rust,ignore
    /// use kstoken::TokenConfig;
    ///
    /// let codec = TokenConfig::from_builder(
    ///     TokenConfig::builder()?
    ///         .set_override("key_id", "k1")?
    ///         .set_override("secret", "s3cr3t")?,
    /// )?
    /// .codec()?;
    /// ```
    pub fn builder() -> Result<ConfigBuilder<DefaultState>, KsError> {
        Ok(::config::Config::builder()
            .set_default("version", Version::KS01.as_str())?
            .set_default("ttl", "PT3H")?)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, KsError> {
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Defaults, overridden by `KSTOKEN_*` environment variables.
    pub fn load() -> Result<Self, KsError> {
        Self::from_builder(Self::builder()?.add_source(environment()))
    }

    /// Defaults, then `path`, then `KSTOKEN_*` environment variables.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, KsError> {
        Self::from_builder(
            Self::builder()?
                .add_source(File::from(path.as_ref()))
                .add_source(environment()),
        )
    }

    pub fn ttl(&self) -> Result<Duration, KsError> {
        parse_ttl(&self.ttl)
    }

    pub fn key_pair(&self) -> Result<KeyPair, KsError> {
        let version: Version = self.version.parse()?;
        Ok(KeyPair::new(&self.key_id, &self.secret)?.with_version(version))
    }

    pub fn codec(&self) -> Result<TokenCodec, KsError> {
        Ok(TokenCodec::new(self.key_pair()?).with_ttl(self.ttl()?))
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("key_id", &self.key_id)
            .field("secret", &"..")
            .field("version", &self.version)
            .field("ttl", &self.ttl)
            .finish()
    }
}

fn environment() -> Environment {
    Environment::with_prefix("KSTOKEN")
}

/// Parse an ISO 8601 duration such as `PT3H` or `P1D`.
///
/// Days count as 24 hours. Months, years and negative durations are rejected.
pub fn parse_ttl(s: &str) -> Result<Duration, KsError> {
    let span: Span = s.parse().map_err(|_| KsError::InvalidDuration)?;
    let duration = span
        .to_duration(SpanRelativeTo::days_are_24_hours())
        .map_err(|_| KsError::InvalidDuration)?;
    Duration::try_from(duration).map_err(|_| KsError::InvalidDuration)
}
