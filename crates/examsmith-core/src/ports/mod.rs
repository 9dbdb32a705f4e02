// ports/mod.rs
// Capability interfaces the pipeline depends on but does not implement.

pub mod llm;
pub mod storage;

pub use llm::{replay_through_sink, ChunkSink, GenerationRequest, LlmProvider, ITEM_SENTINEL};
pub use storage::{StorageAdapter, StoredRow, Table};

#[cfg(any(test, feature = "testing"))]
pub use storage::MockStorageAdapter;
