// http_llm.rs
// Chat-completions HTTP provider. Any OpenAI-compatible endpoint works;
// the pipeline only needs prompt-in, text-out.

use anyhow::Context;
use async_trait::async_trait;
use examsmith_core::ports::{GenerationRequest, LlmProvider};
use serde_json::json;

pub struct HttpLlm {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpLlm {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            // Transport credential, deliberately outside the pipeline
            // configuration set.
            api_key: std::env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty()),
        }
    }
}

#[async_trait]
impl LlmProvider for HttpLlm {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String> {
        let body = json!({
            "model": request.model,
            "temperature": request.temperature,
            "max_tokens": request.max_output_tokens,
            "messages": [{"role": "user", "content": request.prompt}],
        });

        let mut http_request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            http_request = http_request.bearer_auth(key);
        }

        let response = http_request
            .send()
            .await
            .context("language model request failed")?;
        anyhow::ensure!(
            response.status().is_success(),
            "language model endpoint returned {}",
            response.status()
        );

        let payload: serde_json::Value = response
            .json()
            .await
            .context("language model response was not JSON")?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("language model response had no content"))
    }
}
