//! Runtime configuration for the AI gateway.
//!
//! # Invariants
//! - Configuration is read from the environment once by the caller and then
//!   passed by value; nothing here caches global state.
//! - The API key is never logged or included in `Debug` output.

use std::fmt::{Debug, Formatter};
use std::time::Duration;

pub const API_KEY_ENV: &str = "EDUOBSERVA_API_KEY";
pub const FALLBACK_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const BASE_URL_ENV: &str = "EDUOBSERVA_API_BASE_URL";
pub const TIMEOUT_ENV: &str = "EDUOBSERVA_AI_TIMEOUT_SECS";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_FAST_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_PRO_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_VOICE: &str = "Kore";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
/// Sample rate of PCM returned by the speech model.
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

/// Connection and model settings for `GeminiGateway`.
#[derive(Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Reports, suggestions and transcription.
    pub fast_model: String,
    /// Image analysis and chat.
    pub pro_model: String,
    pub tts_model: String,
    pub voice: String,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            fast_model: DEFAULT_FAST_MODEL.to_string(),
            pro_model: DEFAULT_PRO_MODEL.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl GatewayConfig {
    /// Builds configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    ///
    /// Blank values count as unset. An unparsable timeout keeps the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self {
            api_key: read(API_KEY_ENV).or_else(|| read(FALLBACK_API_KEY_ENV)),
            ..Self::default()
        };
        if let Some(base_url) = read(BASE_URL_ENV) {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = read(TIMEOUT_ENV).and_then(|raw| raw.parse::<u64>().ok()) {
            if secs > 0 {
                config.timeout = Duration::from_secs(secs);
            }
        }
        config
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

impl Debug for GatewayConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("fast_model", &self.fast_model)
            .field("pro_model", &self.pro_model)
            .field("tts_model", &self.tts_model)
            .field("voice", &self.voice)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{GatewayConfig, API_KEY_ENV, BASE_URL_ENV, FALLBACK_API_KEY_ENV, TIMEOUT_ENV};
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn primary_key_wins_over_fallback() {
        let config = GatewayConfig::from_lookup(lookup(&[
            (API_KEY_ENV, "primary"),
            (FALLBACK_API_KEY_ENV, "fallback"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("primary"));

        let config = GatewayConfig::from_lookup(lookup(&[
            (API_KEY_ENV, "  "),
            (FALLBACK_API_KEY_ENV, "fallback"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("fallback"));
    }

    #[test]
    fn overrides_base_url_and_timeout() {
        let config = GatewayConfig::from_lookup(lookup(&[
            (BASE_URL_ENV, "http://localhost:8080/v1/"),
            (TIMEOUT_ENV, "5"),
        ]));
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn invalid_timeout_keeps_default() {
        let config = GatewayConfig::from_lookup(lookup(&[(TIMEOUT_ENV, "soon")]));
        assert_eq!(config.timeout, GatewayConfig::default().timeout);
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let rendered = format!("{:?}", GatewayConfig::default().with_api_key("secret-key"));
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }
}
