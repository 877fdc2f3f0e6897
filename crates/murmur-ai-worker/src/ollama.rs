use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError};

const SYSTEM_PROMPT: &str = "You are a helpful assistant. Prefer Chinese when appropriate.";

pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = serde_json::json!({
            "model": req.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": req.prompt },
            ],
            "stream": true,
        });
        let url = format!("{}/api/chat", self.base_url);

        debug!(model = %req.model, "sending request to Ollama");

        let resp = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    ProviderError::Unavailable(e.to_string())
                } else {
                    ProviderError::Http(e)
                }
            })?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "Ollama API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        accumulate_stream(resp, &req.model).await
    }
}

/// Ollama streams newline-delimited JSON; the answer is the concatenation
/// of the message deltas up to the `done` chunk.
async fn accumulate_stream(
    resp: reqwest::Response,
    fallback_model: &str,
) -> Result<ChatResponse, ProviderError> {
    let mut content = String::new();
    let mut model = fallback_model.to_string();
    let mut line_buf = String::new();

    let mut byte_stream = resp.bytes_stream();
    while let Some(chunk) = byte_stream.next().await {
        let chunk = chunk.map_err(|e| ProviderError::Parse(e.to_string()))?;
        let Ok(text) = std::str::from_utf8(&chunk) else {
            continue;
        };
        line_buf.push_str(text);

        // keep the trailing partial line in the buffer
        while let Some(pos) = line_buf.find('\n') {
            let line = line_buf[..pos].trim().to_string();
            line_buf.drain(..=pos);
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<StreamChunk>(&line) {
                Ok(chunk) => {
                    if !chunk.model.is_empty() {
                        model = chunk.model;
                    }
                    content.push_str(&chunk.message.content);
                    if chunk.done {
                        if content.is_empty() {
                            return Err(ProviderError::Empty);
                        }
                        return Ok(ChatResponse { content, model });
                    }
                }
                Err(e) => warn!(line, err = %e, "failed to parse Ollama stream chunk"),
            }
        }
    }

    if content.is_empty() {
        return Err(ProviderError::Empty);
    }
    Ok(ChatResponse { content, model })
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    model: String,
    #[serde(default)]
    message: OllamaMessage,
    #[serde(default)]
    done: bool,
}

#[derive(Deserialize, Default)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}
