//! AI captioning of booth photos.
//!
//! [`CaptioningGateway::analyze`] is total: whatever goes wrong between
//! downloading the photo and parsing the provider's answer, the caller gets a
//! usable [`AnalysisResult`], falling back to a stock caption. There is no
//! retry; one attempt is made per request.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::{Config, constants};
use crate::error::CaptionError;
use crate::image_fetcher::{HttpPhotoLoader, PhotoLoader, mime_type_of};

/// Caption and hashtags generated for a photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub caption: String,
    pub tags: Vec<String>,
}

impl AnalysisResult {
    /// The stock caption used whenever the provider cannot deliver one.
    pub fn fallback() -> Self {
        Self {
            caption: constants::FALLBACK_CAPTION.to_string(),
            tags: constants::FALLBACK_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Parse the provider's JSON text, enforcing the response schema.
    ///
    /// # Errors
    ///
    /// Returns [`CaptionError::SchemaViolation`] if the text is not JSON, if
    /// `caption` or `tags` is missing or mistyped, or if the caption is blank.
    pub fn from_json(text: &str) -> Result<Self, CaptionError> {
        let parsed: AnalysisResult =
            serde_json::from_str(text).map_err(|e| CaptionError::SchemaViolation {
                reason: e.to_string(),
            })?;

        if parsed.caption.trim().is_empty() {
            return Err(CaptionError::SchemaViolation {
                reason: "caption is empty".to_string(),
            });
        }
        Ok(parsed)
    }
}

/// JSON schema the provider must answer with.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "caption": { "type": "STRING" },
            "tags": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            }
        },
        "required": ["caption", "tags"]
    })
}

/// Everything a captioning provider needs for one photo.
#[derive(Debug, Clone)]
pub struct CaptionRequest {
    /// Base64-encoded image bytes.
    pub image_base64: String,
    pub mime_type: &'static str,
    pub prompt: String,
    pub response_schema: Value,
}

/// External generative model that turns a photo into caption JSON.
pub trait CaptionProvider: Send + Sync {
    /// Returns the raw JSON text produced by the model.
    fn generate(&self, request: &CaptionRequest) -> Result<String, CaptionError>;
}

/// Anything able to caption the photo behind a locator.
///
/// The gallery talks to this seam rather than to the gateway directly, so an
/// `Err` here means the captioning backend itself was unreachable, not that a
/// caption came back poor.
pub trait Captioner: Send + Sync {
    fn caption(&self, url: &str) -> Result<AnalysisResult, CaptionError>;
}

/// Google Gemini `generateContent` client.
pub struct GeminiProvider {
    api_url: String,
    model: String,
    api_key: Option<String>,
    timeout_seconds: u64,
}

impl GeminiProvider {
    /// Create a provider for `model` served at `api_url`.
    ///
    /// # Arguments
    ///
    /// * `api_url` - Base URL, e.g. "https://generativelanguage.googleapis.com/v1beta"
    /// * `model` - Model name, e.g. "gemini-2.5-flash"
    /// * `api_key` - API key; without one every request fails (and falls back)
    /// * `timeout_seconds` - Request timeout
    pub fn new(api_url: String, model: String, api_key: Option<String>, timeout_seconds: u64) -> Self {
        Self {
            api_url,
            model,
            api_key,
            timeout_seconds,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_url, self.model)
    }

    fn request_body(request: &CaptionRequest) -> Value {
        json!({
            "contents": [{
                "parts": [
                    {
                        "inline_data": {
                            "mime_type": request.mime_type,
                            "data": request.image_base64
                        }
                    },
                    { "text": request.prompt }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": request.response_schema
            }
        })
    }

    /// Concatenated text parts of the first candidate.
    fn response_text(body: &Value) -> Option<String> {
        let parts = body["candidates"][0]["content"]["parts"].as_array()?;
        let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
        if text.trim().is_empty() { None } else { Some(text) }
    }
}

impl CaptionProvider for GeminiProvider {
    /// Send one `generateContent` request.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No API key is configured
    /// - The HTTP request fails or times out
    /// - The API returns an error status
    /// - The response carries no text
    fn generate(&self, request: &CaptionRequest) -> Result<String, CaptionError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| CaptionError::ProviderFailed {
            status: None,
            message: "no API key configured".to_string(),
        })?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.timeout_seconds))
            .build()
            .map_err(|e| CaptionError::ProviderFailed {
                status: None,
                message: e.to_string(),
            })?;

        let response = client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&Self::request_body(request))
            .send()
            .map_err(|e| CaptionError::ProviderFailed {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(CaptionError::ProviderFailed {
                status: Some(status.as_u16()),
                message,
            });
        }

        let body: Value = response.json().map_err(|_| CaptionError::EmptyResponse)?;
        Self::response_text(&body).ok_or(CaptionError::EmptyResponse)
    }
}

/// Produces captions for booth photos, never failing.
pub struct CaptioningGateway {
    loader: Box<dyn PhotoLoader>,
    provider: Box<dyn CaptionProvider>,
}

impl CaptioningGateway {
    pub fn new(loader: Box<dyn PhotoLoader>, provider: Box<dyn CaptionProvider>) -> Self {
        Self { loader, provider }
    }

    /// Gateway wired to HTTP photo downloads and the configured Gemini model.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Box::new(HttpPhotoLoader::new(config.caption_timeout_seconds)),
            Box::new(GeminiProvider::new(
                config.gemini_api_url.clone(),
                config.gemini_model.clone(),
                config.gemini_api_key.clone(),
                config.caption_timeout_seconds,
            )),
        )
    }

    /// Caption the photo at `url`, or return [`AnalysisResult::fallback`].
    pub fn analyze(&self, url: &str) -> AnalysisResult {
        match self.try_analyze(url) {
            Ok(result) => result,
            Err(e) => {
                warn!("Error analyzing photo {}: {}", url, e);
                AnalysisResult::fallback()
            }
        }
    }

    /// Single captioning attempt, surfacing the first failure.
    pub fn try_analyze(&self, url: &str) -> Result<AnalysisResult, CaptionError> {
        let image_data = self.loader.load(url)?;
        let request = CaptionRequest {
            mime_type: mime_type_of(&image_data),
            image_base64: BASE64.encode(&image_data),
            prompt: constants::CAPTION_PROMPT.to_string(),
            response_schema: response_schema(),
        };

        let text = self.provider.generate(&request)?;
        let result = AnalysisResult::from_json(&text)?;
        debug!("Caption for {}: {:?} {:?}", url, result.caption, result.tags);
        Ok(result)
    }
}

impl Captioner for CaptioningGateway {
    fn caption(&self, url: &str) -> Result<AnalysisResult, CaptionError> {
        Ok(self.analyze(url))
    }
}
