//! Gemini (Google) image editing provider.

use crate::codec::{EncodedImage, InlinePayload};
use crate::config::{EditorConfig, DEFAULT_BASE_URL};
use crate::edit::provider::EditProvider;
use crate::edit::types::{EditMetadata, EditRequest, EditedImage};
use crate::error::{parse_retry_after, sanitize_error_message, RetouchError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeminiModel {
    /// Nano Banana - Gemini 2.5 Flash Image (fast, economical).
    #[default]
    NanoBanana,
    /// Nano Banana Pro - Gemini 3 Pro Image (highest quality).
    NanoBananaPro,
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NanoBanana => "gemini-2.5-flash-image",
            Self::NanoBananaPro => "gemini-3-pro-image-preview",
        }
    }

    /// Parses a short name (`nano-banana`) or an API identifier.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "nano-banana" | "flash" | "gemini-2.5-flash-image" => Some(Self::NanoBanana),
            "nano-banana-pro" | "pro" | "gemini-3-pro-image-preview" => Some(Self::NanoBananaPro),
            _ => None,
        }
    }
}

impl std::fmt::Display for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder for GeminiProvider.
#[derive(Debug, Clone)]
pub struct GeminiProviderBuilder {
    config: EditorConfig,
}

impl Default for GeminiProviderBuilder {
    fn default() -> Self {
        Self {
            config: EditorConfig::default(),
        }
    }
}

impl GeminiProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing editor configuration.
    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Sets the API key. Falls back to `GOOGLE_API_KEY` / `GEMINI_API_KEY`.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Sets the Gemini model variant.
    pub fn model(mut self, model: GeminiModel) -> Self {
        self.config.model = model;
        self
    }

    /// Overrides the REST endpoint root.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Builds the provider, resolving the API key.
    ///
    /// Fails with [`RetouchError::Configuration`] when no key is available;
    /// nothing touches the network here.
    pub fn build(self) -> Result<GeminiProvider> {
        let api_key = self.config.resolve_api_key().ok_or_else(|| {
            RetouchError::Configuration(format!(
                "{} and no API key provided",
                self.config.api_key_env_display()
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .build()?;

        let base_url = if self.config.base_url.trim().is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            self.config.base_url.trim_end_matches('/').to_string()
        };

        Ok(GeminiProvider {
            client,
            api_key,
            model: self.config.model,
            base_url,
        })
    }
}

/// Gemini image editing provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: GeminiModel,
    base_url: String,
}

impl GeminiProvider {
    /// Creates a new `GeminiProviderBuilder`.
    pub fn builder() -> GeminiProviderBuilder {
        GeminiProviderBuilder::new()
    }

    /// Builds a provider straight from an editor configuration.
    pub fn from_config(config: &EditorConfig) -> Result<Self> {
        GeminiProviderBuilder::from_config(config).build()
    }

    /// The model this provider calls.
    pub fn model(&self) -> GeminiModel {
        self.model
    }

    fn model_url(&self) -> String {
        format!("{}/models/{}", self.base_url, self.model.as_str())
    }

    async fn edit_impl(&self, request: &EditRequest) -> Result<Option<EditedImage>> {
        let start = Instant::now();
        let url = format!("{}:generateContent", self.model_url());
        let body = GeminiRequest::from_edit_request(request);

        tracing::debug!(
            model = self.model.as_str(),
            mime_type = %request.image.mime_type,
            bytes = request.image.size(),
            "sending Gemini edit request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(duration_ms, "Gemini edit response received");

        extract_image(gemini_response, self.model, duration_ms)
    }
}

/// Turns a successful response into an image, `None`, or a blocked-content error.
fn extract_image(
    response: GeminiResponse,
    model: GeminiModel,
    duration_ms: u64,
) -> Result<Option<EditedImage>> {
    // Blocks come back as HTTP 200 with prompt feedback
    if let Some(ref feedback) = response.prompt_feedback {
        if let Some(ref reason) = feedback.block_reason {
            let msg = feedback
                .block_reason_message
                .clone()
                .unwrap_or_else(|| format!("Prompt blocked: {}", reason));
            return Err(RetouchError::ContentBlocked(msg));
        }
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        tracing::warn!("Gemini returned no candidates");
        return Ok(None);
    };

    if let Some(ref finish_reason) = candidate.finish_reason {
        match finish_reason.as_str() {
            "SAFETY"
            | "IMAGE_SAFETY"
            | "IMAGE_PROHIBITED_CONTENT"
            | "IMAGE_RECITATION"
            | "RECITATION"
            | "PROHIBITED_CONTENT"
            | "BLOCKLIST" => {
                return Err(RetouchError::ContentBlocked(format!(
                    "Content blocked by Gemini safety filter: {}",
                    finish_reason
                )));
            }
            "IMAGE_OTHER" | "NO_IMAGE" => {
                tracing::warn!(finish_reason = %finish_reason, "Gemini produced no image");
                return Ok(None);
            }
            _ => {} // STOP, MAX_TOKENS, etc. are normal
        }
    }

    let Some(content) = candidate.content else {
        return Ok(None);
    };

    let mut text = Vec::new();
    let mut inline = None;
    for part in content.parts {
        if let Some(t) = part.text {
            text.push(t);
        }
        if inline.is_none() {
            inline = part.inline_data;
        }
    }
    let text = (!text.is_empty()).then(|| text.join("\n"));

    let Some(inline) = inline else {
        if let Some(ref t) = text {
            tracing::warn!(reply = %t, "Gemini answered with text only");
        }
        return Ok(None);
    };

    let image = EncodedImage::from_payload(&InlinePayload {
        mime_type: inline.mime_type,
        data: inline.data,
    })?;

    Ok(Some(EditedImage::new(
        image,
        EditMetadata {
            model: Some(model.as_str().to_string()),
            duration_ms: Some(duration_ms),
            text,
        },
    )))
}

fn model_not_found() -> RetouchError {
    RetouchError::Api {
        status: 404,
        message: "Model not found. Verify the model name is correct.".into(),
    }
}

fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> RetouchError {
    let text = sanitize_error_message(text);
    if status == 404 {
        return model_not_found();
    }
    if status == 429 {
        let retry_after = parse_retry_after(headers).map(Duration::from_secs);
        return RetouchError::RateLimited { retry_after };
    }
    if status == 401 || status == 403 {
        return RetouchError::Auth(text);
    }
    let lower = text.to_lowercase();
    if lower.contains("safety")
        || lower.contains("blocked")
        || lower.contains("content_policy")
        || lower.contains("prohibited")
    {
        return RetouchError::ContentBlocked(text);
    }
    RetouchError::Api {
        status,
        message: text,
    }
}

#[async_trait]
impl EditProvider for GeminiProvider {
    async fn edit(&self, request: &EditRequest) -> Result<Option<EditedImage>> {
        self.edit_impl(request).await
    }

    fn name(&self) -> &str {
        "Gemini (Google)"
    }

    async fn health_check(&self) -> Result<()> {
        let response = self
            .client
            .get(self.model_url())
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        match response.status().as_u16() {
            401 | 403 => Err(RetouchError::Auth("Invalid API key".into())),
            404 => Err(model_not_found()),
            s if !(200..300).contains(&s) => Err(RetouchError::Api {
                status: s,
                message: "Health check failed".into(),
            }),
            _ => Ok(()),
        }
    }
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlinePayload,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
}

impl GeminiRequest {
    fn from_edit_request(req: &EditRequest) -> Self {
        // Image first, then the instruction
        let parts = vec![
            GeminiRequestPart::InlineData {
                inline_data: req.image.to_payload(),
            },
            GeminiRequestPart::Text {
                text: req.instruction.clone(),
            },
        ];

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_modalities: vec!["IMAGE".to_string(), "TEXT".to_string()],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}
