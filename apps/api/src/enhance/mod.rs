//! Text enhancement — rewrites summary, experience and skill text through an LLM.
//!
//! All rewrite calls go through [`TextEnhancer`]. The session never talks to the
//! provider directly, which keeps the provider swappable and testable.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;
pub mod reveal;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum EnhancementError {
    #[error("no API key configured for text enhancement")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },
}

/// What kind of content is being rewritten; selects the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Summary,
    Experience,
    Skill,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhancementOption {
    #[default]
    Professional,
    Grammar,
    Concise,
    Expand,
}

#[async_trait]
pub trait TextEnhancer: Send + Sync {
    async fn enhance(
        &self,
        text: &str,
        kind: ContentKind,
        option: EnhancementOption,
    ) -> Result<String, EnhancementError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini client
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let joined: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        Some(joined)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Gemini `generateContent` client with retry on 429 and 5xx.
#[derive(Clone)]
pub struct GeminiEnhancer {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiEnhancer {
    pub fn new(api_key: Option<String>, model: String) -> Result<Self, EnhancementError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()?,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model,
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn call(&self, prompt: &str) -> Result<GenerateResponse, EnhancementError> {
        let api_key = self.api_key.as_deref().ok_or(EnhancementError::NotConfigured)?;
        let url = format!("{}/{}:generateContent", self.base_url, self.model);
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let mut last_error: Option<EnhancementError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Enhancement call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .post(&url)
                .header("x-goog-api-key", api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(EnhancementError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Enhancement API returned {}: {}", status, body);
                last_error = Some(EnhancementError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(EnhancementError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let parsed: GenerateResponse = response.json().await?;
            debug!("Enhancement call succeeded on attempt {}", attempt + 1);
            return Ok(parsed);
        }

        Err(last_error.unwrap_or(EnhancementError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl TextEnhancer for GeminiEnhancer {
    async fn enhance(
        &self,
        text: &str,
        kind: ContentKind,
        option: EnhancementOption,
    ) -> Result<String, EnhancementError> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }
        let prompt = prompts::build_prompt(text, kind, option);
        let response = self.call(&prompt).await?;
        Ok(clean_output(response.text().as_deref()).unwrap_or_else(|| text.to_string()))
    }
}

/// Trims the model output and strips wrapping quotes or code fences.
/// Returns `None` when nothing usable is left.
fn clean_output(raw: Option<&str>) -> Option<String> {
    let mut text = raw?.trim();
    if let Some(stripped) = text.strip_prefix("```") {
        let stripped = stripped.trim_start_matches(|c: char| c.is_ascii_alphabetic());
        text = stripped.strip_suffix("```").unwrap_or(stripped).trim();
    }
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        text = text[1..text.len() - 1].trim();
    }
    (!text.is_empty()).then(|| text.to_string())
}
