// testing/mod.rs
// Deterministic doubles for the two external capabilities, plus shared
// fixtures. Enabled for unit tests and via the "testing" feature.

pub mod fixtures;
pub mod memory_storage;
pub mod scripted_llm;

pub use fixtures::{biology_quiz_intent, framed, mcq_json, short_answer_json};
pub use memory_storage::MemoryStorage;
pub use scripted_llm::ScriptedLlm;
