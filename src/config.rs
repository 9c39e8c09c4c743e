//! Editor configuration with environment fallbacks.

use crate::edit::GeminiModel;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variables checked, in order, for the Gemini API key.
pub const API_KEY_ENV_VARS: &[&str] = &["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// Default Gemini REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Instruction sent by "Auto Enhance".
pub const DEFAULT_ENHANCE_PROMPT: &str = "Enhance this photo: improve lighting, color balance, \
     sharpness and clarity while keeping the composition and subject unchanged.";

/// Settings shared by the edit client and the session controller.
#[derive(Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Explicit API key; when unset the key is looked up in [`EditorConfig::api_key_env`].
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Environment variables consulted for the API key.
    pub api_key_env: Vec<String>,
    /// Gemini model variant.
    pub model: GeminiModel,
    /// REST endpoint root.
    pub base_url: String,
    /// Request timeout for the edit call.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Instruction used by "Auto Enhance".
    pub enhance_prompt: String,
    /// JPEG quality used when re-encoding JPEG sources.
    pub jpeg_quality: u8,
}

impl std::fmt::Debug for EditorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_key_env", &self.api_key_env)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("jpeg_quality", &self.jpeg_quality)
            .finish()
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: API_KEY_ENV_VARS.iter().map(|s| s.to_string()).collect(),
            model: GeminiModel::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
            enhance_prompt: DEFAULT_ENHANCE_PROMPT.to_string(),
            jpeg_quality: 92,
        }
    }
}

impl EditorConfig {
    /// Creates a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `RETOUCH_MODEL` and `RETOUCH_BASE_URL`.
    ///
    /// The API key is not read here; it is resolved when the client is built.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(model) = std::env::var("RETOUCH_MODEL")
            .ok()
            .and_then(|m| GeminiModel::from_name(&m))
        {
            config.model = model;
        }
        if let Ok(url) = std::env::var("RETOUCH_BASE_URL") {
            if !url.trim().is_empty() {
                config.base_url = url.trim().trim_end_matches('/').to_string();
            }
        }
        config
    }

    /// Sets the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Replaces the environment variables searched for the API key.
    pub fn api_key_env<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.api_key_env = vars.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the Gemini model variant.
    pub fn model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    /// Sets the REST endpoint root.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the "Auto Enhance" instruction.
    pub fn enhance_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.enhance_prompt = prompt.into();
        self
    }

    /// Sets the JPEG re-encode quality (clamped to 1..=100).
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Resolves the API key: explicit value first, then the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| {
                self.api_key_env
                    .iter()
                    .find_map(|var| std::env::var(var).ok())
            })
            .filter(|key| !key.trim().is_empty())
    }

    /// Human-readable list of the key variables, for error messages.
    pub(crate) fn api_key_env_display(&self) -> String {
        if self.api_key_env.is_empty() {
            "no API key environment variable configured".to_string()
        } else {
            format!("{} not set", self.api_key_env.join(" / "))
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
