//! Generation client and streamed-response parsing.
//!
//! The client mirrors the embedding adapter: direct HTTP requests against an
//! Ollama-compatible runtime, injected configuration, typed errors. Two
//! response modes exist. Non-streamed calls expect one JSON payload
//! atomically and fail loudly when it does not decode. Streamed calls pipe
//! the provider's newline-delimited records through
//! [`stream::DeltaParser`], forwarding each content delta the moment it
//! parses.

pub mod stream;

use async_stream::try_stream;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::config::GenerationConfig;
use stream::DeltaParser;

/// Errors raised by the generation provider.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Provider was unreachable, returned a non-success status, or the
    /// transport failed mid-stream.
    #[error("Generation request failed: {0}")]
    Failed(String),
    /// Provider returned an expected-atomic payload that did not match the
    /// requested output schema.
    #[error("Generation provider returned malformed output: {0}")]
    MalformedOutput(String),
}

/// Decoding options forwarded to the provider with each request.
#[derive(Debug, Clone, Copy)]
pub struct DecodingOptions {
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum number of tokens to generate.
    pub num_predict: u32,
    /// Optional nucleus-sampling cutoff.
    pub top_p: Option<f32>,
    /// Optional repetition penalty.
    pub repeat_penalty: Option<f32>,
}

impl DecodingOptions {
    fn to_json(self) -> Value {
        let mut options = Map::new();
        options.insert("temperature".into(), json!(self.temperature));
        options.insert("num_predict".into(), json!(self.num_predict));
        if let Some(top_p) = self.top_p {
            options.insert("top_p".into(), json!(top_p));
        }
        if let Some(penalty) = self.repeat_penalty {
            options.insert("repeat_penalty".into(), json!(penalty));
        }
        Value::Object(options)
    }
}

/// A role-tagged conversational message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message author role (`system`, `user`, or `assistant`).
    pub role: String,
    /// Message body.
    pub content: String,
}

/// Stream of parsed text deltas from one generation request.
pub type DeltaStream = BoxStream<'static, Result<String, GenerationError>>;

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    done: bool,
}

/// HTTP generation client for an Ollama-compatible runtime.
pub struct GenerationClient {
    http: Client,
    config: GenerationConfig,
}

impl GenerationClient {
    /// Construct a client from injected provider settings.
    pub fn new(config: GenerationConfig) -> Self {
        let http = Client::builder()
            .user_agent("cramkit/0.1")
            .build()
            .expect("Failed to construct reqwest::Client for generation");
        Self { http, config }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Run a non-streamed completion and return the full response text.
    ///
    /// Set `format_json` when the prompt instructs the model to emit a JSON
    /// object; the provider then constrains decoding accordingly.
    pub async fn generate(
        &self,
        prompt: &str,
        options: DecodingOptions,
        format_json: bool,
    ) -> Result<String, GenerationError> {
        let mut payload = json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
            "options": options.to_json(),
        });
        if format_json {
            payload["format"] = json!("json");
        }

        let response = self
            .http
            .post(self.endpoint("api/generate"))
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                GenerationError::Failed(format!(
                    "failed to reach generation provider at {}: {error}",
                    self.config.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Failed(format!(
                "generation provider returned {status}: {body}"
            )));
        }

        let body: GenerateResponse = response.json().await.map_err(|error| {
            GenerationError::MalformedOutput(format!("failed to decode response body: {error}"))
        })?;

        if !body.done {
            return Err(GenerationError::MalformedOutput(
                "provider returned an incomplete response for a non-streamed request".into(),
            ));
        }

        Ok(body.response)
    }

    /// Run a streamed completion for a single prompt, yielding text deltas.
    pub async fn stream_generate(
        &self,
        prompt: &str,
        options: DecodingOptions,
    ) -> Result<DeltaStream, GenerationError> {
        let payload = json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": true,
            "options": options.to_json(),
        });
        self.open_stream("api/generate", payload).await
    }

    /// Run a streamed chat completion over a message history.
    pub async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        options: DecodingOptions,
    ) -> Result<DeltaStream, GenerationError> {
        let payload = json!({
            "model": self.config.model,
            "messages": messages,
            "stream": true,
            "options": options.to_json(),
        });
        self.open_stream("api/chat", payload).await
    }

    async fn open_stream(&self, path: &str, payload: Value) -> Result<DeltaStream, GenerationError> {
        let response = self
            .http
            .post(self.endpoint(path))
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                GenerationError::Failed(format!(
                    "failed to reach generation provider at {}: {error}",
                    self.config.base_url
                ))
            })?;

        // Upstream failures surface before any delta is emitted.
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Failed(format!(
                "generation provider returned {status}: {body}"
            )));
        }

        let mut bytes = response.bytes_stream();
        Ok(Box::pin(try_stream! {
            let mut parser = DeltaParser::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|error| {
                    GenerationError::Failed(format!("stream interrupted: {error}"))
                })?;
                for delta in parser.push(&chunk) {
                    yield delta;
                }
            }
            if let Some(delta) = parser.finish() {
                yield delta;
            }
        }))
    }
}
