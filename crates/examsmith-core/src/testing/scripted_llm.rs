// testing/scripted_llm.rs
// Pre-scripted LLM provider: returns canned responses in order and
// records every prompt, so pipeline behavior is fully deterministic.

use crate::ports::{GenerationRequest, LlmProvider};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

pub struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    /// When set, every call fails with this message instead.
    failure: Option<String>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
            failure: None,
        }
    }

    /// A provider that is permanently down.
    pub fn unavailable(message: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            failure: Some(message.to_string()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        if let Some(message) = &self.failure {
            anyhow::bail!("{}", message);
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("scripted responses exhausted"))
    }
}
