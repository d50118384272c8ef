//! Centralized default constants and fetch configuration for attache.
//!
//! Every tunable value lives here so the attachment, fetch and MIME modules
//! never carry their own magic numbers.

use std::time::Duration;

// =============================================================================
// HTTP
// =============================================================================

/// Whole-request timeout for HEAD/GET against attachment URLs.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// TCP/TLS connect timeout for attachment URLs.
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Env var overriding [`HTTP_TIMEOUT_SECS`].
pub const ENV_HTTP_TIMEOUT_SECS: &str = "ATTACHE_HTTP_TIMEOUT_SECS";

/// Env var overriding [`HTTP_CONNECT_TIMEOUT_SECS`].
pub const ENV_HTTP_CONNECT_TIMEOUT_SECS: &str = "ATTACHE_HTTP_CONNECT_TIMEOUT_SECS";

/// Env var setting an explicit `User-Agent` for outbound requests.
pub const ENV_HTTP_USER_AGENT: &str = "ATTACHE_HTTP_USER_AGENT";

// =============================================================================
// MIME DETECTION
// =============================================================================

/// Leading bytes of a file read for content sniffing.
pub const SNIFF_LIMIT_BYTES: usize = 3072;

/// Fallback type for binary data with no recognizable signature.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Type reported for valid UTF-8 text with no more specific match.
pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// Type reported for empty input.
pub const TEXT_PLAIN: &str = "text/plain";

// =============================================================================
// FETCH CONFIG
// =============================================================================

/// HTTP client settings for fetching URL-backed attachments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Optional `User-Agent` header; reqwest sends none when unset.
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: HTTP_TIMEOUT_SECS,
            connect_timeout_secs: HTTP_CONNECT_TIMEOUT_SECS,
            user_agent: None,
        }
    }
}

impl FetchConfig {
    /// Load configuration from environment variables with fallback to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup(ENV_HTTP_TIMEOUT_SECS) {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout_secs = secs,
                _ => tracing::warn!(
                    value = %val,
                    "Invalid {}, using default",
                    ENV_HTTP_TIMEOUT_SECS
                ),
            }
        }

        if let Some(val) = lookup(ENV_HTTP_CONNECT_TIMEOUT_SECS) {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.connect_timeout_secs = secs,
                _ => tracing::warn!(
                    value = %val,
                    "Invalid {}, using default",
                    ENV_HTTP_CONNECT_TIMEOUT_SECS
                ),
            }
        }

        if let Some(val) = lookup(ENV_HTTP_USER_AGENT) {
            if !val.trim().is_empty() {
                config.user_agent = Some(val);
            }
        }

        config
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
