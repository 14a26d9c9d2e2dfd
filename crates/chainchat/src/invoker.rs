//! Model invoker: chat completions against an OpenAI-compatible API.
//!
//! One capability, two consumption modes. [`ChatClient::stream`] yields a
//! lazily parsed sequence of response fragments; [`ChatClient::complete`]
//! is the terminal aggregation path that concatenates the same fragment
//! stream into a single string. Dropping the stream mid-flight aborts the
//! underlying request and releases the connection.
//!
//! Failures propagate directly — transport errors and non-success
//! responses become errors without retries. Callers layer their own retry
//! policy if they need one.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures::{Stream, StreamExt};

/// A cancellable sequence of response fragments. Dropping it releases the
/// underlying connection.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

use chainchat_core::models::Message;

use crate::config::ModelConfig;

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
}

impl ChatClient {
    /// Create a client with an explicit API key.
    pub fn new(config: &ModelConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.name.clone(),
            temperature: config.temperature,
        })
    }

    /// Create a client reading the API key from `OPENAI_API_KEY`.
    ///
    /// A missing key is a startup error, not a per-request one.
    pub fn from_env(config: &ModelConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Self::new(config, api_key)
    }

    /// Send the request and check the response status.
    async fn send(&self, messages: &[Message]) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": messages,
            "stream": true,
        });

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Model request to {} failed", url))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("Model API error {}: {}", status, text);
        }

        Ok(resp)
    }

    /// Invoke the model and stream response fragments as they arrive.
    ///
    /// The returned stream terminates after the service's `[DONE]` marker
    /// (or end of body). A transport failure mid-stream surfaces as an
    /// `Err` item and ends the stream.
    pub async fn stream(&self, messages: &[Message]) -> Result<FragmentStream> {
        let resp = self.send(messages).await?;

        let state = (
            Box::pin(resp.bytes_stream()),
            Vec::<u8>::new(),
            VecDeque::<String>::new(),
            false,
        );
        let fragments = futures::stream::try_unfold(
            state,
            |(mut bytes, mut buf, mut pending, mut done)| async move {
                loop {
                    if let Some(fragment) = pending.pop_front() {
                        return Ok(Some((fragment, (bytes, buf, pending, done))));
                    }
                    if done {
                        return Ok(None);
                    }
                    match bytes.next().await {
                        Some(chunk) => {
                            let chunk = chunk.context("Model stream transport failure")?;
                            buf.extend_from_slice(&chunk);
                            // SSE events are newline-delimited; multibyte
                            // characters never straddle a complete line.
                            while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                                let line: Vec<u8> = buf.drain(..=pos).collect();
                                let line = String::from_utf8_lossy(&line);
                                match parse_sse_line(&line)? {
                                    SseEvent::Fragment(f) => pending.push_back(f),
                                    SseEvent::Done => done = true,
                                    SseEvent::Ignored => {}
                                }
                            }
                        }
                        None => done = true,
                    }
                }
            },
        );
        Ok(Box::pin(fragments))
    }

    /// Invoke the model and return the complete response text.
    pub async fn complete(&self, messages: &[Message]) -> Result<String> {
        let mut fragments = self.stream(messages).await?;
        let mut content = String::new();
        while let Some(fragment) = fragments.next().await {
            content.push_str(&fragment?);
        }
        Ok(content)
    }
}

/// One parsed server-sent event line.
#[derive(Debug, PartialEq)]
enum SseEvent {
    /// A piece of response text from `choices[0].delta.content`.
    Fragment(String),
    /// The `[DONE]` terminator.
    Done,
    /// Blank lines, comments, and deltas without content (role headers,
    /// finish markers).
    Ignored,
}

fn parse_sse_line(line: &str) -> Result<SseEvent> {
    let line = line.trim();
    let data = match line.strip_prefix("data:") {
        Some(d) => d.trim(),
        None => return Ok(SseEvent::Ignored),
    };
    if data == "[DONE]" {
        return Ok(SseEvent::Done);
    }

    let event: serde_json::Value =
        serde_json::from_str(data).context("Malformed stream event from model API")?;
    match event["choices"][0]["delta"]["content"].as_str() {
        Some(content) if !content.is_empty() => Ok(SseEvent::Fragment(content.to_string())),
        _ => Ok(SseEvent::Ignored),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fragment_line() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#;
        assert_eq!(
            parse_sse_line(line).unwrap(),
            SseEvent::Fragment("Hello".to_string())
        );
    }

    #[test]
    fn test_parse_done_marker() {
        assert_eq!(parse_sse_line("data: [DONE]").unwrap(), SseEvent::Done);
    }

    #[test]
    fn test_parse_ignores_role_delta_and_blank_lines() {
        let role_line = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_sse_line(role_line).unwrap(), SseEvent::Ignored);
        assert_eq!(parse_sse_line("").unwrap(), SseEvent::Ignored);
        assert_eq!(parse_sse_line(": keep-alive").unwrap(), SseEvent::Ignored);
    }

    #[test]
    fn test_parse_malformed_json_is_error() {
        assert!(parse_sse_line("data: {not json").is_err());
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces_as_error() {
        let config = ModelConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 5,
            ..ModelConfig::default()
        };
        let client = ChatClient::new(&config, "test-key".to_string()).unwrap();
        let err = client.complete(&[Message::user("hi")]).await.unwrap_err();
        assert!(err.to_string().contains("Model request"));
    }
}
