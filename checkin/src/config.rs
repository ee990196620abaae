//! Configuration management for check-in resolution.
//!
//! Loads configuration from environment variables with sensible defaults.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;

/// Default QR check-in buffer: six hours.
pub const DEFAULT_CHECKIN_BUFFER_SECS: u64 = 6 * 60 * 60;

/// Environment variable overriding the QR check-in buffer, in seconds.
pub const CHECKIN_BUFFER_ENV: &str = "SERIES_PASS_CHECKIN_BUFFER_SECONDS";

/// Check-in resolution configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinConfig {
    /// How far ahead of now a QR check-in may resolve an occurrence, in seconds
    pub checkin_buffer_secs: u64,
}

impl Default for CheckinConfig {
    fn default() -> Self {
        Self {
            checkin_buffer_secs: DEFAULT_CHECKIN_BUFFER_SECS,
        }
    }
}

impl CheckinConfig {
    /// Load configuration from environment variables.
    ///
    /// Missing or unparsable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            checkin_buffer_secs: lookup(CHECKIN_BUFFER_ENV)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_CHECKIN_BUFFER_SECS),
        }
    }

    /// Override the QR check-in buffer
    #[must_use]
    pub const fn with_checkin_buffer_secs(mut self, secs: u64) -> Self {
        self.checkin_buffer_secs = secs;
        self
    }

    /// The QR check-in buffer as a duration.
    ///
    /// Values too large to represent saturate to the maximum duration.
    #[must_use]
    pub fn checkin_buffer(&self) -> Duration {
        i64::try_from(self.checkin_buffer_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }
}
