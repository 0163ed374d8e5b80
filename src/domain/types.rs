//! Type-safe wrappers using new-type pattern
//!
//! Prevents mixing arbitrary strings with validated TSA endpoints and
//! signature member locations.

use crate::domain::constants::SIGNATURE_PATHS;
use crate::infra::error::{TimestampingError, TimestampingResult};
use std::fmt;
use std::str::FromStr;

/// Type-safe wrapper for Time-Stamp Authority URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsaUrl(String);

impl TsaUrl {
    /// Create a new `TsaUrl` after validation
    pub fn new(url: impl AsRef<str>) -> TimestampingResult<Self> {
        let url = url.as_ref().trim();
        Self::validate_url(url)?;
        Ok(TsaUrl(url.to_string()))
    }

    /// Get the URL as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Host part of the URL, for log lines
    #[must_use]
    pub fn authority(&self) -> &str {
        let rest = self
            .0
            .split_once("://")
            .map_or(self.0.as_str(), |(_, rest)| rest);
        rest.split('/').next().unwrap_or(rest)
    }

    fn validate_url(url: &str) -> TimestampingResult<()> {
        let Some(rest) = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
        else {
            return Err(TimestampingError::ValidationError(format!(
                "TSA URL must start with http:// or https://, got: {url}"
            )));
        };

        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if host.is_empty() {
            return Err(TimestampingError::ValidationError(format!(
                "TSA URL has no host: {url}"
            )));
        }

        if url.chars().any(char::is_whitespace) {
            return Err(TimestampingError::ValidationError(format!(
                "TSA URL must not contain whitespace: {url}"
            )));
        }

        Ok(())
    }
}

impl FromStr for TsaUrl {
    type Err = TimestampingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for TsaUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Archive path of the one signature member of an ASiC-E container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignaturePath(&'static str);

impl SignaturePath {
    /// Match a member path against the accepted signature locations
    #[must_use]
    pub fn recognize(path: &str) -> Option<Self> {
        SIGNATURE_PATHS
            .iter()
            .copied()
            .find(|candidate| *candidate == path)
            .map(SignaturePath)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for SignaturePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
