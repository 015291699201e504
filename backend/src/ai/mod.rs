//! AI module for coding question generation.
//!
//! Sends a topic to the Gemini `generateContent` endpoint and turns the reply
//! into a [`Question`]. The reply is free text: the first balanced JSON object
//! in it is extracted, validated and converted.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use reshaper::ai::QuestionClient;
//!
//! let client = QuestionClient::from_env()?;
//! let question = client.generate_question("list comprehensions").await?;
//! println!("{}", question.question);
//! ```

pub mod prompt;

use serde::Deserialize;
use serde_json::Value;
use std::env;
use std::time::Duration;

use crate::api::logs::{log_info, log_success, log_warning};
use crate::error::{AiError, AiResult};
use crate::models::Question;
use crate::validation::validate_question;

pub use prompt::{build_request, question_prompt};

/// Default model
const DEFAULT_MODEL: &str = "gemini-1.5-pro-001";

/// Default API root
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default number of attempts
const DEFAULT_MAX_RETRIES: u32 = 3;

/// First retry delay in milliseconds, doubled on each retry
const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Question generation client
#[derive(Clone)]
pub struct QuestionClient {
    api_key: String,
    model: String,
    base_url: String,
    max_retries: u32,
    http: reqwest::Client,
}

/// `generateContent` response structure
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// API error response
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl QuestionClient {
    /// Create a new client with explicit API key
    pub fn new(api_key: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            http,
        }
    }

    /// Create a client from `GEMINI_API_KEY` (and optional `GEMINI_MODEL`)
    pub fn from_env() -> AiResult<Self> {
        let _ = dotenvy::dotenv();

        let api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| AiError::MissingApiKey("GEMINI_API_KEY not set".to_string()))?;

        let client = Self::new(api_key);
        Ok(match env::var("GEMINI_MODEL") {
            Ok(model) if !model.trim().is_empty() => client.with_model(model.trim()),
            _ => client,
        })
    }

    /// Set the model to use
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Point the client at another API root
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Set the number of attempts (at least one)
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate a question on `topic`, retrying with exponential backoff.
    pub async fn generate_question(&self, topic: &str) -> AiResult<Question> {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.try_generate(topic).await {
                Ok(question) => return Ok(question),
                Err(e) => {
                    log_warning(format!("Attempt {}/{} failed: {}", attempt, self.max_retries, e));
                    last_error = Some(e);

                    if attempt < self.max_retries {
                        let delay = RETRY_BASE_DELAY_MS << (attempt - 1);
                        log_info(format!("↻ Retrying in {}ms...", delay));
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AiError::Api("Unknown error".to_string())))
    }

    /// Single attempt
    async fn try_generate(&self, topic: &str) -> AiResult<Question> {
        let text = self.call_api(topic).await?;
        parse_question(&text)
    }

    /// Call the `generateContent` endpoint and return the concatenated text parts
    async fn call_api(&self, topic: &str) -> AiResult<String> {
        log_info(format!("📡 Calling question service (model: {})...", self.model));

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(topic))
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let body = response.text().await.map_err(request_error)?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ApiErrorBody>(&body) {
                return Err(AiError::Api(error.error.message));
            }
            return Err(AiError::Api(format!("HTTP {}: {}", status, body)));
        }

        let response: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| AiError::Parse(e.to_string()))?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<Vec<_>>().join(""))
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AiError::Parse("Empty response".to_string()));
        }

        log_success(format!("Received {} bytes", text.len()));
        Ok(text)
    }
}

fn request_error(e: reqwest::Error) -> AiError {
    if e.is_timeout() {
        AiError::Timeout
    } else {
        AiError::RequestFailed(e.to_string())
    }
}

/// Extract the first balanced `{...}` substring.
///
/// Braces inside JSON string literals are ignored. Returns `None` when no
/// object opens or the first one never closes.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse a service reply into a [`Question`].
pub fn parse_question(text: &str) -> AiResult<Question> {
    let json = extract_json_object(text)
        .ok_or_else(|| AiError::Parse("No JSON object found in response".to_string()))?;

    let value: Value = serde_json::from_str(json)
        .map_err(|e| AiError::Parse(format!("Malformed JSON object: {}", e)))?;

    validate_question(&value).map_err(|errors| AiError::Parse(errors.join("; ")))?;

    Ok(Question {
        question: field_text(value.get("question")),
        sample_input: field_text(value.get("sample_input")),
        expected_output: field_text(value.get("expected_output")),
    })
}

/// Text form of a field: strings as-is, other values as JSON, missing as empty.
fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
