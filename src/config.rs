//! Environment-driven client configuration.
//!
//! Values are read from the process environment (a `.env` file is loaded by
//! the binary through `dotenvy`); every setting has a default matching the
//! public ATSPM deployment.

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://report-api-bdppc3riba-wm.a.run.app";
pub const DEFAULT_ORIGIN: &str = "https://atspm-website-bdppc3riba-wm.a.run.app";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Root of the report API, without the `/v1/...` path.
    pub base_url: String,
    /// Website origin sent in `Origin`/`Referer`.
    pub origin: String,
    pub request_timeout: Duration,
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            request_timeout: Duration::from_secs(30),
            max_retries: 2,
        }
    }
}

impl ClientConfig {
    /// Reads `ATSPM_BASE_URL`, `ATSPM_ORIGIN`, `ATSPM_TIMEOUT_SECS` and
    /// `ATSPM_MAX_RETRIES`. Unset or unparsable values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            base_url: lookup("ATSPM_BASE_URL").unwrap_or(defaults.base_url),
            origin: lookup("ATSPM_ORIGIN").unwrap_or(defaults.origin),
            request_timeout: lookup("ATSPM_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_retries: lookup("ATSPM_MAX_RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_retries),
        }
    }
}
