// domain/item.rs
// Writer output items and the Builder's final artifact.

use super::blueprint::{DifficultyProfile, OrderingStrategy};
use super::bloom::BloomLevel;
use super::intent::{MathFormat, QuestionType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One item as emitted by the Writer over the sentinel protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedItem {
    pub slot_id: usize,
    pub question_type: QuestionType,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl GeneratedItem {
    /// Trimmed, deduplicated option list; MCQ validity checks read this.
    pub fn trimmed_options(&self) -> Vec<String> {
        self.options
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|o| o.trim().to_string())
            .collect()
    }
}

/// Display-ready item in the assembled assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentItem {
    /// 1-based position in the printed document.
    pub question_number: usize,
    /// Back-reference to the blueprint slot this item filled.
    pub slot_id: usize,
    pub question_type: QuestionType,
    pub bloom_level: BloomLevel,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub estimated_time_seconds: u32,
}

/// Plan metadata carried on the final artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentMetadata {
    pub difficulty_profile: DifficultyProfile,
    pub ordering_strategy: OrderingStrategy,
    pub pacing_seconds_per_item: u32,
    pub total_estimated_time_seconds: u32,
    pub math_format: MathFormat,
    pub course: String,
    pub topic: String,
    pub grade: u8,
}

/// The Builder's printable artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalAssessment {
    pub id: String,
    pub generated_at: DateTime<Utc>,
    pub items: Vec<AssessmentItem>,
    pub total_items: usize,
    pub metadata: AssessmentMetadata,
}
