// pipeline/pipeline_tests.rs
// End-to-end runs against the scripted LLM and in-memory storage.

use super::*;
use crate::domain::Dossier;
use crate::testing::{biology_quiz_intent, framed, short_answer_json, MemoryStorage, ScriptedLlm};

fn clean_blocks() -> Vec<String> {
    vec![
        short_answer_json(1, "Explain how photosynthesis stores energy.", "As sugar."),
        short_answer_json(
            2,
            "Describe what the chloroplast does during photosynthesis.",
            "Captures light.",
        ),
        short_answer_json(
            3,
            "Summarize how light drives photosynthesis in a leaf.",
            "Light powers sugar production.",
        ),
    ]
}

fn pipeline(llm: ScriptedLlm, storage: Arc<MemoryStorage>) -> Pipeline {
    Pipeline::with_seed(Arc::new(llm), storage, PipelineConfig::default(), 11)
}

#[tokio::test]
async fn end_to_end_clean_run_produces_a_complete_assessment() {
    let storage = Arc::new(MemoryStorage::new());
    let llm = ScriptedLlm::new(vec![framed(&clean_blocks())]);
    let pipeline = pipeline(llm, storage.clone());

    let outcome = pipeline
        .generate_assessment(&biology_quiz_intent(), &CancelToken::new())
        .await
        .unwrap();

    // Every slot filled exactly once, in order.
    let assessment = &outcome.assessment;
    assert_eq!(assessment.total_items, 3);
    assert_eq!(assessment.items.len(), 3);
    let mut slot_ids: Vec<usize> = assessment.items.iter().map(|i| i.slot_id).collect();
    assert_eq!(slot_ids, vec![1, 2, 3]);
    slot_ids.dedup();
    assert_eq!(slot_ids.len(), 3);
    assert!(assessment.id.starts_with("assessment_"));

    assert_eq!(outcome.quality.quality_score, 10.0);
    assert!(outcome.trace.steps.len() >= 5);

    // A clean run builds trust.
    let row = storage
        .read_one(Table::Dossiers, "teacher-1:writer:biology")
        .await
        .unwrap()
        .unwrap();
    let dossier: Dossier = serde_json::from_value(row.data).unwrap();
    assert_eq!(dossier.trust_score, 6.0);
    assert_eq!(dossier.domain_mastery.clean_runs, 1);

    // History recorded the run.
    let history = storage.appended(Table::AssessmentHistory, "teacher-1");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["questionCount"], 3);
}

#[tokio::test]
async fn same_seed_and_script_reproduce_the_same_items() {
    let outcome_a = pipeline(
        ScriptedLlm::new(vec![framed(&clean_blocks())]),
        Arc::new(MemoryStorage::new()),
    )
    .generate_assessment(&biology_quiz_intent(), &CancelToken::new())
    .await
    .unwrap();
    let outcome_b = pipeline(
        ScriptedLlm::new(vec![framed(&clean_blocks())]),
        Arc::new(MemoryStorage::new()),
    )
    .generate_assessment(&biology_quiz_intent(), &CancelToken::new())
    .await
    .unwrap();

    let items_a = serde_json::to_string(&outcome_a.assessment.items).unwrap();
    let items_b = serde_json::to_string(&outcome_b.assessment.items).unwrap();
    assert_eq!(items_a, items_b);
}

#[tokio::test]
async fn daily_cap_blocks_the_run_over_limit() {
    let storage = Arc::new(MemoryStorage::new());
    let mut config = PipelineConfig::default();
    config.daily_free_limit = 1;
    let llm = ScriptedLlm::new(vec![framed(&clean_blocks()); 2]);
    let pipeline = Pipeline::with_seed(Arc::new(llm), storage.clone(), config, 11);

    pipeline
        .generate_assessment(&biology_quiz_intent(), &CancelToken::new())
        .await
        .unwrap();

    let second = pipeline
        .generate_assessment(&biology_quiz_intent(), &CancelToken::new())
        .await;
    assert!(matches!(
        second,
        Err(PipelineError::QuotaExceeded { used: 1, limit: 1 })
    ));
}

#[tokio::test]
async fn usage_cap_read_failure_fails_closed() {
    let storage = Arc::new(MemoryStorage::failing());
    let llm = ScriptedLlm::new(vec![framed(&clean_blocks())]);
    let pipeline = pipeline(llm, storage);

    let result = pipeline
        .generate_assessment(&biology_quiz_intent(), &CancelToken::new())
        .await;
    assert!(matches!(result, Err(PipelineError::UsageCapRead(_))));
}

#[tokio::test]
async fn invalid_intent_is_rejected_before_any_work() {
    let storage = Arc::new(MemoryStorage::new());
    let llm = ScriptedLlm::new(vec![]);
    let pipeline = pipeline(llm, storage.clone());

    let mut intent = biology_quiz_intent();
    intent.time_minutes = 0;
    let result = pipeline
        .generate_assessment(&intent, &CancelToken::new())
        .await;
    assert!(matches!(result, Err(PipelineError::InvalidIntent(_))));
    assert!(storage
        .appended(Table::UsageLog, "teacher-1")
        .is_empty());
    // A rejection before any agent ran touches no governance state.
    assert!(storage
        .read_one(Table::Dossiers, "teacher-1:writer:biology")
        .await
        .unwrap()
        .is_none());
    assert!(storage
        .appended(Table::AssessmentHistory, "teacher-1")
        .is_empty());
}

#[tokio::test]
async fn cancelled_run_still_reaches_scribe() {
    let storage = Arc::new(MemoryStorage::new());
    let llm = ScriptedLlm::new(vec![]);
    let pipeline = pipeline(llm, storage.clone());
    let cancel = CancelToken::new();
    cancel.cancel();

    let result = pipeline
        .generate_assessment(&biology_quiz_intent(), &cancel)
        .await;
    assert!(matches!(result, Err(PipelineError::Cancelled)));

    // The dossier still counted the run, without moving trust.
    let row = storage
        .read_one(Table::Dossiers, "teacher-1:writer:biology")
        .await
        .unwrap()
        .unwrap();
    let dossier: Dossier = serde_json::from_value(row.data).unwrap();
    assert_eq!(dossier.trust_score, Dossier::TRUST_START);
    assert_eq!(dossier.domain_mastery.runs, 1);
}

#[tokio::test]
async fn predictive_defaults_fill_a_missing_question_count() {
    let storage = Arc::new(MemoryStorage::new());
    // This teacher habitually asks for two items; pacing alone would
    // infer three.
    storage
        .upsert(
            Table::PredictiveDefaults,
            crate::ports::StoredRow {
                key: "teacher-1".to_string(),
                version: 1,
                data: serde_json::json!({"modal": {"questionCount": 2}}),
            },
        )
        .await
        .unwrap();

    let blocks = vec![
        short_answer_json(1, "Explain how photosynthesis stores energy.", "As sugar."),
        short_answer_json(
            2,
            "Describe what the chloroplast does during photosynthesis.",
            "Captures light.",
        ),
    ];
    let llm = ScriptedLlm::new(vec![framed(&blocks)]);
    let pipeline = pipeline(llm, storage.clone());

    let mut intent = biology_quiz_intent();
    intent.question_count = None;
    let outcome = pipeline
        .generate_assessment(&intent, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.assessment.total_items, 2);
}

#[tokio::test]
async fn provider_outage_maps_to_llm_unavailable() {
    let storage = Arc::new(MemoryStorage::new());
    let llm = ScriptedLlm::unavailable("socket closed");
    let pipeline = pipeline(llm, storage.clone());

    let result = pipeline
        .generate_assessment(&biology_quiz_intent(), &CancelToken::new())
        .await;
    assert!(matches!(result, Err(PipelineError::LlmUnavailable(_))));

    // The fatal termination still reached SCRIBE: both agent dossiers
    // counted the run, and the empty failure earned no trust.
    for agent in ["writer", "architect"] {
        let key = format!("teacher-1:{}:biology", agent);
        let row = storage
            .read_one(Table::Dossiers, &key)
            .await
            .unwrap()
            .unwrap();
        let dossier: Dossier = serde_json::from_value(row.data).unwrap();
        assert_eq!(dossier.domain_mastery.runs, 1, "{} run uncounted", agent);
        assert_eq!(dossier.trust_score, Dossier::TRUST_START);
        assert_eq!(dossier.domain_mastery.clean_runs, 0);
    }

    // The run is in history, marked as not cancelled.
    let history = storage.appended(Table::AssessmentHistory, "teacher-1");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["cancelled"], false);
    assert_eq!(history[0]["questionCount"], serde_json::Value::Null);
}
