// ports/llm.rs
// Language-model capability port. The pipeline only ever needs "turn a
// prompt into text"; streaming is optional and may be simulated.

use async_trait::async_trait;

/// Literal marker the Writer instructs the model to emit after every
/// self-contained item. Anything after the last sentinel is treated as
/// truncation leftover.
pub const ITEM_SENTINEL: &str = "<END_OF_PROBLEM>";

/// One generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
}

/// Receiver for streamed item blocks.
pub trait ChunkSink: Send {
    /// A complete sentinel-terminated block, sentinel stripped.
    fn on_item(&mut self, block: &str);
    /// Trailing output that never reached a sentinel.
    fn on_truncation(&mut self, leftover: &str);
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Blocking generation. Transport failures surface as errors with a
    /// human-safe message.
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String>;

    /// Streaming generation. The default implementation falls back to
    /// blocking generation and replays the result through the sink, so
    /// pipeline correctness never depends on true streaming.
    async fn generate_streaming(
        &self,
        request: &GenerationRequest,
        sink: &mut (dyn ChunkSink + '_),
    ) -> anyhow::Result<String> {
        let full = self.generate(request).await?;
        replay_through_sink(&full, sink);
        Ok(full)
    }
}

/// Splits a blocking response into sentinel-framed blocks and replays
/// them as if they had streamed.
pub fn replay_through_sink(output: &str, sink: &mut (dyn ChunkSink + '_)) {
    let mut rest = output;
    while let Some(pos) = rest.find(ITEM_SENTINEL) {
        sink.on_item(rest[..pos].trim());
        rest = &rest[pos + ITEM_SENTINEL.len()..];
    }
    let leftover = rest.trim();
    if !leftover.is_empty() {
        sink.on_truncation(leftover);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        items: Vec<String>,
        leftover: Option<String>,
    }

    impl ChunkSink for RecordingSink {
        fn on_item(&mut self, block: &str) {
            self.items.push(block.to_string());
        }
        fn on_truncation(&mut self, leftover: &str) {
            self.leftover = Some(leftover.to_string());
        }
    }

    #[test]
    fn replay_splits_complete_blocks() {
        let mut sink = RecordingSink::default();
        let output = format!("{{\"a\":1}}{s}{{\"b\":2}}{s}", s = ITEM_SENTINEL);
        replay_through_sink(&output, &mut sink);
        assert_eq!(sink.items, vec!["{\"a\":1}", "{\"b\":2}"]);
        assert!(sink.leftover.is_none());
    }

    #[test]
    fn replay_reports_trailing_leftover() {
        let mut sink = RecordingSink::default();
        let output = format!("{{\"a\":1}}{}{{\"b\":", ITEM_SENTINEL);
        replay_through_sink(&output, &mut sink);
        assert_eq!(sink.items.len(), 1);
        assert_eq!(sink.leftover.as_deref(), Some("{\"b\":"));
    }
}
