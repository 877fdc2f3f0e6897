use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError};

const SYSTEM_PROMPT: &str = "You are Kimi by Moonshot AI. Prefer Chinese when appropriate.";

/// Moonshot chat-completions endpoint, bearer-key auth, non-streaming.
pub struct KimiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl KimiProvider {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for KimiProvider {
    fn name(&self) -> &str {
        "kimi"
    }

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::Unavailable(
                "missing api key for kimi".to_string(),
            ));
        }
        let body = serde_json::json!({
            "model": req.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": req.prompt },
            ],
            "temperature": 0.3,
            "stream": false,
        });
        let url = format!("{}/v1/chat/completions", self.base_url);

        debug!(model = %req.model, "sending request to Kimi");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
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
            warn!(status, body = %text, "Kimi API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        let api: ApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        let model = if api.model.is_empty() {
            req.model.clone()
        } else {
            api.model
        };
        let content = api
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(ProviderError::Empty)?;
        Ok(ChatResponse { content, model })
    }
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}
