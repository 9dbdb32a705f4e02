// domain/intent.rs
// Teacher intent: the input boundary of the pipeline.

use super::bloom::BloomLevel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of classroom artifact the teacher is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssessmentType {
    BellRinger,
    ExitTicket,
    Quiz,
    Test,
    Worksheet,
    TestReview,
}

impl AssessmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentType::BellRinger => "bellRinger",
            AssessmentType::ExitTicket => "exitTicket",
            AssessmentType::Quiz => "quiz",
            AssessmentType::Test => "test",
            AssessmentType::Worksheet => "worksheet",
            AssessmentType::TestReview => "testReview",
        }
    }

    /// Warm-up and wrap-up formats stay shallow regardless of level.
    pub fn is_shallow_format(&self) -> bool {
        matches!(self, AssessmentType::BellRinger | AssessmentType::ExitTicket)
    }

    /// Question types used when the teacher does not specify a mix.
    pub fn default_question_types(&self) -> Vec<QuestionType> {
        match self {
            AssessmentType::BellRinger | AssessmentType::ExitTicket => {
                vec![QuestionType::MultipleChoice, QuestionType::ShortAnswer]
            }
            AssessmentType::Quiz => vec![
                QuestionType::MultipleChoice,
                QuestionType::TrueFalse,
                QuestionType::ShortAnswer,
            ],
            AssessmentType::Test => vec![
                QuestionType::MultipleChoice,
                QuestionType::ShortAnswer,
                QuestionType::ConstructedResponse,
            ],
            AssessmentType::Worksheet => vec![
                QuestionType::FillInBlank,
                QuestionType::ShortAnswer,
                QuestionType::MultipleChoice,
            ],
            AssessmentType::TestReview => vec![
                QuestionType::MultipleChoice,
                QuestionType::ShortAnswer,
            ],
        }
    }
}

impl fmt::Display for AssessmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Course placement of the students taking the assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StudentLevel {
    Remedial,
    Standard,
    Honors,
    Ap,
}

impl StudentLevel {
    /// Base Bloom band (floor, ceiling) before caps and constraints.
    pub fn base_band(&self) -> (BloomLevel, BloomLevel) {
        match self {
            StudentLevel::Remedial => (BloomLevel::Remember, BloomLevel::Apply),
            StudentLevel::Standard => (BloomLevel::Understand, BloomLevel::Analyze),
            StudentLevel::Honors => (BloomLevel::Apply, BloomLevel::Evaluate),
            StudentLevel::Ap => (BloomLevel::Analyze, BloomLevel::Evaluate),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StudentLevel::Remedial => "remedial",
            StudentLevel::Standard => "standard",
            StudentLevel::Honors => "honors",
            StudentLevel::Ap => "ap",
        }
    }
}

/// How math expressions should render in the final artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum MathFormat {
    #[default]
    Unicode,
    Plain,
    Latex,
}

/// Item formats the Writer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    FillInBlank,
    ShortAnswer,
    ConstructedResponse,
}

impl QuestionType {
    /// Average minutes a student spends answering one item of this type.
    pub fn pacing_minutes(&self) -> f64 {
        match self {
            QuestionType::TrueFalse => 0.5,
            QuestionType::MultipleChoice => 1.0,
            QuestionType::FillInBlank => 1.0,
            QuestionType::ShortAnswer => 2.5,
            QuestionType::ConstructedResponse => 6.0,
        }
    }

    /// Open formats suit deeper cognitive work.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            QuestionType::ShortAnswer | QuestionType::ConstructedResponse
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multipleChoice",
            QuestionType::TrueFalse => "trueFalse",
            QuestionType::FillInBlank => "fillInBlank",
            QuestionType::ShortAnswer => "shortAnswer",
            QuestionType::ConstructedResponse => "constructedResponse",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A teacher-supplied source material excerpt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: String,
    pub name: String,
    pub content: String,
}

/// Structured request from the teacher. Everything downstream derives
/// from this plus the persisted governance state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherIntent {
    pub user_id: String,
    pub grade: u8,
    pub course: String,
    pub unit: String,
    pub assessment_type: AssessmentType,
    pub student_level: StudentLevel,
    pub time_minutes: u32,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub lesson_name: Option<String>,
    #[serde(default)]
    pub question_types: Option<Vec<QuestionType>>,
    #[serde(default)]
    pub question_count: Option<usize>,
    #[serde(default)]
    pub math_format: Option<MathFormat>,
    #[serde(default)]
    pub additional_details: Option<String>,
    #[serde(default)]
    pub source_documents: Vec<SourceDocument>,
    #[serde(default)]
    pub example_assessment: Option<String>,
}

impl TeacherIntent {
    /// Reject requests the pipeline cannot plan for.
    pub fn validate(&self) -> Result<(), String> {
        if self.user_id.trim().is_empty() {
            return Err("userId must not be empty".to_string());
        }
        if self.course.trim().is_empty() {
            return Err("course must not be empty".to_string());
        }
        if self.time_minutes == 0 {
            return Err("timeMinutes must be at least 1".to_string());
        }
        if let Some(count) = self.question_count {
            if count == 0 {
                return Err("questionCount must be at least 1 when given".to_string());
            }
        }
        if let Some(types) = &self.question_types {
            if types.is_empty() {
                return Err("questionTypes must not be empty when given".to_string());
            }
        }
        Ok(())
    }

    /// Subject domain used for dossier and guardrail keying.
    pub fn domain(&self) -> String {
        self.course.trim().to_lowercase()
    }

    /// The most specific topic label available.
    pub fn effective_topic(&self) -> String {
        self.topic
            .as_deref()
            .or(self.lesson_name.as_deref())
            .unwrap_or(&self.unit)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent() -> TeacherIntent {
        TeacherIntent {
            user_id: "t1".to_string(),
            grade: 8,
            course: "Biology".to_string(),
            unit: "Cells".to_string(),
            assessment_type: AssessmentType::Quiz,
            student_level: StudentLevel::Standard,
            time_minutes: 20,
            topic: None,
            lesson_name: None,
            question_types: None,
            question_count: None,
            math_format: None,
            additional_details: None,
            source_documents: vec![],
            example_assessment: None,
        }
    }

    #[test]
    fn validate_rejects_zero_time() {
        let mut bad = intent();
        bad.time_minutes = 0;
        assert!(bad.validate().is_err());
        assert!(intent().validate().is_ok());
    }

    #[test]
    fn effective_topic_prefers_topic_then_lesson() {
        let mut i = intent();
        assert_eq!(i.effective_topic(), "Cells");
        i.lesson_name = Some("Organelles".to_string());
        assert_eq!(i.effective_topic(), "Organelles");
        i.topic = Some("Mitochondria".to_string());
        assert_eq!(i.effective_topic(), "Mitochondria");
    }

    #[test]
    fn base_bands_by_level() {
        assert_eq!(
            StudentLevel::Remedial.base_band(),
            (BloomLevel::Remember, BloomLevel::Apply)
        );
        assert_eq!(
            StudentLevel::Ap.base_band(),
            (BloomLevel::Analyze, BloomLevel::Evaluate)
        );
    }

    #[test]
    fn intent_deserializes_from_camel_case() {
        let json = r#"{
            "userId": "t1",
            "grade": 7,
            "course": "Science",
            "unit": "Plants",
            "assessmentType": "bellRinger",
            "studentLevel": "honors",
            "timeMinutes": 10,
            "topic": "photosynthesis"
        }"#;
        let parsed: TeacherIntent = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.assessment_type, AssessmentType::BellRinger);
        assert_eq!(parsed.student_level, StudentLevel::Honors);
        assert_eq!(parsed.topic.as_deref(), Some("photosynthesis"));
    }
}
