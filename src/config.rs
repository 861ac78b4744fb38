use anyhow::{bail, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
const API_URL_ENV: &str = "WEBSCOUT_API_URL";
const FLUSH_TRAILING_LINE_ENV: &str = "WEBSCOUT_FLUSH_TRAILING_LINE";
const REQUIRE_TERMINAL_EVENT_ENV: &str = "WEBSCOUT_REQUIRE_TERMINAL_EVENT";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the backend agent, without the endpoint path.
    pub api_url: String,
    /// Parse an unterminated final line at stream end instead of dropping it.
    pub flush_trailing_line: bool,
    /// Report a stream that closes without `complete`/`error` as a failure.
    pub require_terminal_event: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            flush_trailing_line: false,
            require_terminal_event: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let api_url = std::env::var(API_URL_ENV)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(Self {
            api_url,
            flush_trailing_line: env_flag(FLUSH_TRAILING_LINE_ENV),
            require_terminal_event: env_flag(REQUIRE_TERMINAL_EVENT_ENV),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            bail!(
                "Invalid {API_URL_ENV} '{}': expected http:// or https:// URL",
                self.api_url
            );
        }

        if let Err(error) = Url::parse(&self.api_url) {
            bail!("Invalid {API_URL_ENV} '{}': {error}", self.api_url);
        }

        Ok(())
    }
}

/// Whether the named variable switches a flag on. Accepts `true`/`1`/`yes`/`on`
/// in any case; anything else, including an unset variable, is off.
fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        )
    })
}
