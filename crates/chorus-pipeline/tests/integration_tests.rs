//! End-to-end pipeline tests over mock providers, the hash embedding
//! backend, and scripted mapper output.

use chorus_dispatch::{DispatchConfig, FanoutDispatcher};
use chorus_domain::embedding::HashEmbeddingBackend;
use chorus_domain::traits::{ContextRole, ContextStore, ProviderAdapter};
use chorus_domain::{ClaimId, ProviderId, SessionId, StatementFate};
use chorus_pipeline::{
    MemoryContextStore, PipelineConfig, ScriptedMapper, TurnPipeline,
};
use chorus_provider::MockProvider;
use std::sync::Arc;
use std::time::Duration;

const ANSWER_A: &str = "Water boils at 100 degrees Celsius at sea level.\n\n\
                        The boiling point drops as altitude increases.";
const ANSWER_B: &str = "At standard pressure, water boils at 100C.\n\n\
                        Higher altitude means a lower boiling point.";
const ANSWER_C: &str = "Water always boils at exactly 100C regardless of conditions.";

const MAPPER_JSON: &str = r#"{
    "claims": [
        {"label": "Water boils at 100C at sea level", "cited": ["s0.0", "s1.0"], "supporters": [0, 1]},
        {"label": "Boiling point decreases with altitude", "cited": ["s0.1", "s1.1"], "supporters": [0, 1]},
        {"label": "Boiling point never varies", "cited": ["s2.0"], "supporters": [2]}
    ],
    "edges": [
        {"from": "c1", "to": "c2", "kind": "conflicts", "question": "Does altitude change the boiling point?"}
    ],
    "conditionals": [
        {"description": "at standard pressure", "affected": ["c0"]}
    ]
}"#;

fn pipeline_with(
    providers: Vec<MockProvider>,
    mapper_text: &str,
    store: Arc<MemoryContextStore>,
) -> TurnPipeline {
    let mut dispatcher = FanoutDispatcher::new(DispatchConfig::default());
    let mut config = PipelineConfig::default();
    for provider in providers {
        config.providers.push(provider.id());
        dispatcher.register(Arc::new(provider));
    }
    TurnPipeline::new(
        Arc::new(dispatcher),
        store,
        Arc::new(HashEmbeddingBackend::new(64)),
        Arc::new(ScriptedMapper::new(mapper_text)),
        config,
    )
}

#[tokio::test]
async fn test_full_turn_produces_claim_artifact() {
    let store = Arc::new(MemoryContextStore::new());
    let pipeline = pipeline_with(
        vec![
            MockProvider::new("alpha", ANSWER_A),
            MockProvider::new("beta", ANSWER_B),
            MockProvider::new("gamma", ANSWER_C),
        ],
        MAPPER_JSON,
        Arc::clone(&store),
    );
    let session = SessionId::new("turn-1");
    let outcome = pipeline
        .run_turn(&session, "When does water boil?")
        .await
        .unwrap();

    let artifact = &outcome.artifact;
    assert!(!artifact.parse_failed);
    assert_eq!(artifact.claims.len(), 3);
    assert_eq!(artifact.conditionals.len(), 1);
    assert!(!artifact.shadow_statements.is_empty());
    assert!(artifact.substrate.is_some());

    // The conflicting pair forms its own tier above the foundation.
    assert!(artifact.tiers.len() >= 2);
    assert!(artifact
        .tiers
        .iter()
        .any(|t| t.claim_ids.contains(&ClaimId::derive(1))
            && t.claim_ids.contains(&ClaimId::derive(2))));
    // One forcing point per conflict and per conditional.
    assert_eq!(artifact.forcing_points.len(), 2);

    // Every statement is accounted for in the completeness audit.
    let completeness = artifact.completeness.as_ref().unwrap();
    assert_eq!(completeness.fates.len(), artifact.shadow_statements.len());
}

#[tokio::test]
async fn test_prompt_contexts_persisted() {
    let store = Arc::new(MemoryContextStore::new());
    let pipeline = pipeline_with(
        vec![
            MockProvider::new("alpha", ANSWER_A),
            MockProvider::new("beta", ANSWER_B),
        ],
        MAPPER_JSON,
        Arc::clone(&store),
    );
    let session = SessionId::new("turn-2");
    pipeline
        .prompt_step(&session, "When does water boil?")
        .await
        .unwrap();

    // Persistence is spawned fire-and-forget; give it a beat to land.
    let mut contexts = Vec::new();
    for _ in 0..50 {
        if let Ok(found) = store.get_contexts(&session, ContextRole::Prompt) {
            contexts = found;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(contexts.len(), 2);
    assert_eq!(contexts[0].provider, ProviderId::new("alpha"));
    assert_eq!(contexts[0].context, ANSWER_A);
}

#[tokio::test]
async fn test_unparseable_mapper_output_degrades_to_raw_text() {
    let store = Arc::new(MemoryContextStore::new());
    let pipeline = pipeline_with(
        vec![MockProvider::new("alpha", ANSWER_A)],
        "Sorry, I can't produce JSON today.",
        store,
    );
    let session = SessionId::new("turn-3");
    let outcome = pipeline
        .run_turn(&session, "When does water boil?")
        .await
        .unwrap();

    let artifact = &outcome.artifact;
    assert!(artifact.parse_failed);
    assert!(artifact.claims.is_empty());
    assert!(artifact.survey_skipped);
    assert!(outcome.survey.is_none());
    // The statements and the raw mapper text survive.
    assert!(!artifact.shadow_statements.is_empty());
    assert_eq!(
        artifact.raw_mapper_text.as_deref(),
        Some("Sorry, I can't produce JSON today.")
    );
}

#[tokio::test]
async fn test_partial_provider_failure_still_synthesizes() {
    let store = Arc::new(MemoryContextStore::new());
    let pipeline = pipeline_with(
        vec![
            MockProvider::new("alpha", ANSWER_A),
            MockProvider::new("beta", ANSWER_B),
            MockProvider::failing(
                "gamma",
                chorus_domain::ProviderError::Upstream("503".to_string()),
            ),
        ],
        r#"{"claims": [{"label": "Water boils at 100C", "cited": ["s0.0", "s1.0"], "supporters": [0, 1]}]}"#,
        store,
    );
    let session = SessionId::new("turn-4");
    let outcome = pipeline
        .run_turn(&session, "When does water boil?")
        .await
        .unwrap();

    // Two providers answered; the turn proceeds on their text.
    assert_eq!(outcome.settlement.texts_in_request_order().len(), 2);
    assert_eq!(outcome.artifact.claims.len(), 1);
}

#[tokio::test]
async fn test_unanimous_claims_skip_survey() {
    let store = Arc::new(MemoryContextStore::new());
    let pipeline = pipeline_with(
        vec![
            MockProvider::new("alpha", ANSWER_A),
            MockProvider::new("beta", ANSWER_B),
        ],
        r#"{"claims": [
            {"label": "Water boils at 100C", "cited": ["s0.0", "s1.0"], "supporters": [0, 1]},
            {"label": "Altitude lowers the boiling point", "cited": ["s0.1", "s1.1"], "supporters": [0, 1]}
        ]}"#,
        store,
    );
    let session = SessionId::new("turn-5");
    let outcome = pipeline
        .run_turn(&session, "When does water boil?")
        .await
        .unwrap();

    // Full support, no conflicts: consensus is high and the survey is gated
    // off.
    assert!(outcome.artifact.survey_skipped);
    assert!(outcome.survey.is_none());
}

#[tokio::test]
async fn test_canonical_ids_reference_real_statements() {
    let store = Arc::new(MemoryContextStore::new());
    let pipeline = pipeline_with(
        vec![
            MockProvider::new("alpha", ANSWER_A),
            MockProvider::new("beta", ANSWER_B),
            MockProvider::new("gamma", ANSWER_C),
        ],
        MAPPER_JSON,
        store,
    );
    let session = SessionId::new("turn-6");
    let outcome = pipeline
        .run_turn(&session, "When does water boil?")
        .await
        .unwrap();

    let artifact = &outcome.artifact;
    for claim in &artifact.claims {
        for sid in &claim.canonical_statement_ids {
            assert!(
                artifact.shadow_statements.iter().any(|s| &s.id == sid),
                "canonical id {} has no statement",
                sid
            );
        }
        // Canonical evidence comes from supporter models only.
        for sid in &claim.canonical_statement_ids {
            let statement = artifact
                .shadow_statements
                .iter()
                .find(|s| &s.id == sid)
                .unwrap();
            assert!(claim.supporters.contains(&statement.model_index));
        }
    }

    // No statement fate stronger than its claim membership: cited fates only
    // for statements some claim carries.
    let completeness = artifact.completeness.as_ref().unwrap();
    for (sid, fate) in &completeness.fates {
        if matches!(fate, StatementFate::Primary | StatementFate::Supporting) {
            assert!(artifact
                .claims
                .iter()
                .any(|c| c.canonical_statement_ids.contains(sid)));
        }
    }
}

#[tokio::test]
async fn test_empty_provider_text_degrades() {
    let store = Arc::new(MemoryContextStore::new());
    let pipeline = pipeline_with(
        vec![MockProvider::new("alpha", "hub")],
        MAPPER_JSON,
        store,
    );
    let session = SessionId::new("turn-7");
    // A lone "?" is below the minimum statement length, so extraction
    // yields nothing and the turn degrades.
    let artifact = pipeline
        .mapping_step(&session, "q", &["?".to_string()])
        .await
        .unwrap();
    assert!(artifact.parse_failed);
    assert!(artifact.claims.is_empty());
}
