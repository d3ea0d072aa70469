//! Access to text-generation models.
//!
//! The analysis pipeline only depends on the [`TextGenerator`] trait. [`GeminiClient`] implements
//! it for Google's Gemini REST API.
use crate::settings::Settings;
use anyhow::{Context, Result, bail};
use log::{debug, warn};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::thread;
use std::time::Duration;

/// The environment variable holding the API key
pub const API_KEY_ENV_VAR: &str = "GOOGLE_API_KEY";

/// Timeout for a single request
const REQUEST_TIMEOUT: Duration = Duration::from_mins(2);

/// Something which can turn a prompt into text
pub trait TextGenerator {
    /// Generate a response to `prompt` using the named model
    fn generate(&self, model: &str, prompt: &str) -> Result<String>;
}

/// A client for the Gemini `generateContent` endpoint
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    max_retries: u32,
}

impl GeminiClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Key for the Gemini API
    /// * `base_url` - Base URL of the API, e.g. `https://generativelanguage.googleapis.com/v1beta`
    /// * `max_retries` - Number of attempts to make when rate limited
    pub fn new(api_key: String, base_url: &str, max_retries: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries,
        })
    }

    /// Create a client using the API key from the environment and the program settings
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = env::var(API_KEY_ENV_VAR).with_context(|| {
            format!(
                "The {API_KEY_ENV_VAR} environment variable must be set (a .env file may be used)"
            )
        })?;

        Self::new(api_key, &settings.api_base_url, settings.max_retries)
    }

    /// The URL for generating content with the given model
    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.base_url)
    }

    /// Make a single request
    fn send(&self, url: &str, request: &GenerateRequest) -> Result<Attempt<GenerateResponse>> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .context("Request to the Gemini API failed")?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Ok(Attempt::RateLimited);
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!("Gemini API returned {status}: {body}");
        }

        let body = response
            .json()
            .context("Could not decode response from the Gemini API")?;
        Ok(Attempt::Done(body))
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let url = self.endpoint(model);
        let request = GenerateRequest::new(prompt);
        debug!("Sending {} character prompt to {model}", prompt.len());

        let response = retry_rate_limited(
            self.max_retries,
            || self.send(&url, &request),
            thread::sleep,
        )?;

        response.text()
    }
}

/// Outcome of a single request
enum Attempt<T> {
    Done(T),
    RateLimited,
}

/// How long to wait after the given (zero-based) attempt was rate limited
fn retry_delay(attempt: u32) -> Duration {
    Duration::from_secs(u64::from(attempt) + 2)
}

/// Run `request`, retrying while it is rate limited, up to `max_retries` attempts in total.
///
/// Errors other than rate limiting are returned immediately.
fn retry_rate_limited<T, F, S>(max_retries: u32, mut request: F, mut sleep: S) -> Result<T>
where
    F: FnMut() -> Result<Attempt<T>>,
    S: FnMut(Duration),
{
    let attempts = max_retries.max(1);
    let mut attempt = 0;
    loop {
        match request()? {
            Attempt::Done(value) => return Ok(value),
            Attempt::RateLimited if attempt + 1 < attempts => {
                let delay = retry_delay(attempt);
                warn!(
                    "Rate limit (HTTP 429) hit. Retrying in {} seconds...",
                    delay.as_secs()
                );
                sleep(delay);
                attempt += 1;
            }
            Attempt::RateLimited => bail!("Still rate limited after {attempts} attempts"),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str) -> Self {
        Self {
            contents: [RequestContent {
                parts: [RequestPart { text: prompt }],
            }],
        }
    }
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
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
    /// The text of the first candidate, with all of its parts joined together
    fn text(self) -> Result<String> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            bail!("The model returned no candidates");
        };

        Ok(candidate
            .content
            .into_iter()
            .flat_map(|content| content.parts)
            .filter_map(|part| part.text)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;

    #[test]
    fn test_request_body() {
        let request = GenerateRequest::new("Forecast prices");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"contents": [{"parts": [{"text": "Forecast prices"}]}]})
        );
    }

    #[test]
    fn test_response_text() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [
                {"content": {"parts": [{"text": "Q1 2025 | 85\n"}, {"text": "Q2 2025 | 86"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(response.text().unwrap(), "Q1 2025 | 85\nQ2 2025 | 86");
    }

    #[test]
    fn test_response_text_empty_candidate() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#).unwrap();
        assert_eq!(response.text().unwrap(), "");
    }

    #[test]
    fn test_response_text_no_candidates() {
        let response: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_error!(response.text(), "The model returned no candidates");
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new("key".into(), "https://example.com/v1beta/", 3).unwrap();
        assert_eq!(
            client.endpoint("gemini-2.0-flash"),
            "https://example.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_retry_rate_limited_succeeds() {
        let mut calls = 0;
        let mut sleeps = Vec::new();
        let result = retry_rate_limited(
            3,
            || {
                calls += 1;
                Ok(if calls < 3 {
                    Attempt::RateLimited
                } else {
                    Attempt::Done("ok")
                })
            },
            |delay| sleeps.push(delay.as_secs()),
        );
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls, 3);
        assert_eq!(sleeps, [2, 3]);
    }

    #[test]
    fn test_retry_rate_limited_gives_up() {
        let mut calls = 0;
        let result: Result<()> = retry_rate_limited(
            3,
            || {
                calls += 1;
                Ok(Attempt::RateLimited)
            },
            |_| {},
        );
        assert_error!(result, "Still rate limited after 3 attempts");
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_retry_rate_limited_other_error() {
        let mut calls = 0;
        let result: Result<()> = retry_rate_limited(
            3,
            || {
                calls += 1;
                bail!("Gemini API returned 500")
            },
            |_| panic!("Should not sleep"),
        );
        assert_error!(result, "Gemini API returned 500");
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_retry_rate_limited_zero_retries() {
        let result = retry_rate_limited(0, || Ok(Attempt::Done(1)), |_| {});
        assert_eq!(result.unwrap(), 1);
    }
}
