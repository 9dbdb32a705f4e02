// testing/fixtures.rs
// Shared builders for intents and sentinel-framed writer output.

use crate::domain::{AssessmentType, QuestionType, StudentLevel, TeacherIntent};
use crate::ports::ITEM_SENTINEL;

/// A short three-item biology quiz: the workhorse fixture whose pacing
/// works out cleanly.
pub fn biology_quiz_intent() -> TeacherIntent {
    TeacherIntent {
        user_id: "teacher-1".to_string(),
        grade: 8,
        course: "Biology".to_string(),
        unit: "Cells".to_string(),
        assessment_type: AssessmentType::Quiz,
        student_level: StudentLevel::Standard,
        time_minutes: 8,
        topic: Some("photosynthesis".to_string()),
        lesson_name: None,
        question_types: Some(vec![QuestionType::ShortAnswer]),
        question_count: Some(3),
        math_format: None,
        additional_details: None,
        source_documents: vec![],
        example_assessment: None,
    }
}

/// One short-answer item block as the Writer wire format expects it.
pub fn short_answer_json(slot_id: usize, prompt: &str, answer: &str) -> String {
    format!(
        r#"{{"slotId": {}, "questionType": "shortAnswer", "prompt": "{}", "answer": "{}"}}"#,
        slot_id, prompt, answer
    )
}

/// One multiple-choice item block.
pub fn mcq_json(slot_id: usize, prompt: &str, options: &[&str], answer: &str) -> String {
    let rendered: Vec<String> = options.iter().map(|o| format!("\"{}\"", o)).collect();
    format!(
        r#"{{"slotId": {}, "questionType": "multipleChoice", "prompt": "{}", "options": [{}], "answer": "{}"}}"#,
        slot_id,
        prompt,
        rendered.join(", "),
        answer
    )
}

/// Joins item blocks with the sentinel, terminating the last one.
pub fn framed(blocks: &[String]) -> String {
    let mut out = String::new();
    for block in blocks {
        out.push_str(block);
        out.push('\n');
        out.push_str(ITEM_SENTINEL);
        out.push('\n');
    }
    out
}
