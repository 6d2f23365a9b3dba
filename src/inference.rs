use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, instrument};

use crate::constants;
use crate::errors::InferenceError;

/// A remote text generator the resolver can ask first.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Returns the raw generated text for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, InferenceError>;
}

// Body accepted by the Hugging Face text-generation inference API
#[derive(Serialize, Debug)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GenerationParameters {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub do_sample: bool,
    pub top_p: f32,
    pub return_full_text: bool,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            max_new_tokens: constants::MAX_NEW_TOKENS,
            temperature: constants::TEMPERATURE,
            do_sample: constants::DO_SAMPLE,
            top_p: constants::TOP_P,
            return_full_text: constants::RETURN_FULL_TEXT,
        }
    }
}

pub struct HuggingFaceClient {
    client: Client,
    endpoint: String,
    api_key: String,
    parameters: GenerationParameters,
}

impl HuggingFaceClient {
    /// Builds a client whose every request is bounded by `timeout`.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self, InferenceError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(InferenceError::MissingCredential);
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            parameters: GenerationParameters::default(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn parameters(&self) -> &GenerationParameters {
        &self.parameters
    }
}

#[async_trait]
impl InferenceBackend for HuggingFaceClient {
    #[instrument(skip(self, prompt), fields(endpoint = %self.endpoint))]
    async fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
        let request_payload = GenerationRequest {
            inputs: prompt,
            parameters: self.parameters.clone(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(%status, %error_body, "Inference API request failed");
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body: error_body,
            });
        }

        let body = response.text().await.map_err(transport_error)?;
        let payload: Value = serde_json::from_str(&body)
            .map_err(|e| InferenceError::Format(format!("invalid JSON: {}", e)))?;

        let generated = extract_generated_text(&payload)?;
        debug!(chars = generated.len(), "Received generated text");
        Ok(generated)
    }
}

fn transport_error(err: reqwest::Error) -> InferenceError {
    if err.is_timeout() {
        InferenceError::Timeout
    } else {
        InferenceError::Transport(err)
    }
}

// A null, false, zero or empty `error` field does not mean failure.
fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Pulls `generated_text` out of either accepted payload shape:
/// `[{"generated_text": ...}, ...]` or `{"generated_text": ...}`.
pub fn extract_generated_text(payload: &Value) -> Result<String, InferenceError> {
    if let Some(err) = payload.get("error").filter(|err| is_set(err)) {
        let message = match err {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Err(InferenceError::Api(message));
    }

    let candidate = match payload {
        Value::Array(items) => items.first().and_then(|first| first.get("generated_text")),
        Value::Object(_) => payload.get("generated_text"),
        _ => None,
    };

    match candidate.and_then(Value::as_str) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(InferenceError::Format(
            "no generated_text in response".to_string(),
        )),
    }
}

/// Removes the first echo of `prompt` from `generated` and trims the remainder.
/// May return an empty string when the model only echoed the prompt.
pub fn strip_prompt_echo(generated: &str, prompt: &str) -> String {
    generated.replacen(prompt, "", 1).trim().to_string()
}
