//! Property-based tests for llm-eval
//!
//! Pattern:
//! - Test invariants of the analyzer, token counter and status rollup
//! - Test orchestrator ordering and isolation over random failure masks
//! - Run with ProptestConfig::with_cases(..)
//! - Must complete in <30 seconds for pre-commit hook

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use llm_eval::experiment::{
    ExperimentSpec, MemoryRunStore, ModelStatus, Orchestrator, RunStatus, RunStore,
};
use llm_eval::graph::{strip_code_fence, GraphAnalyzer};
use llm_eval::provider::{ChatMessage, Completion, CompletionProvider, ProviderFailure};
use llm_eval::tokens::{EncodingTokenCounter, TokenCounter, Tokenizer};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Generate a property map with `0..max` integer entries
fn arb_properties(max: usize) -> impl Strategy<Value = Map<String, Value>> {
    proptest::collection::btree_map("[a-z]{1,6}", 0i64..100, 0..max)
        .prop_map(|m| m.into_iter().map(|(k, v)| (k, json!(v))).collect())
}

/// Generate a list of graph elements, each with optional properties
fn arb_elements(max: usize) -> impl Strategy<Value = Vec<Option<Map<String, Value>>>> {
    proptest::collection::vec(proptest::option::of(arb_properties(5)), 0..max)
}

fn to_elements(items: &[Option<Map<String, Value>>]) -> Value {
    Value::Array(
        items
            .iter()
            .map(|props| match props {
                Some(props) => json!({"id": "x", "properties": props}),
                None => json!({"id": "x"}),
            })
            .collect(),
    )
}

fn property_total(items: &[Option<Map<String, Value>>]) -> usize {
    items.iter().flatten().map(Map::len).sum()
}

fn arb_tokenizer() -> impl Strategy<Value = Tokenizer> {
    prop_oneof![
        Just(Tokenizer::O200kBase),
        Just(Tokenizer::Cl100kBase),
        Just(Tokenizer::P50kBase),
    ]
}

/// Encoders are expensive to build, so every case shares one counter.
fn shared_counter() -> &'static EncodingTokenCounter {
    static COUNTER: OnceLock<EncodingTokenCounter> = OnceLock::new();
    COUNTER.get_or_init(EncodingTokenCounter::new)
}

/// Fails every model whose name starts with `fail`.
struct MaskProvider;

#[async_trait]
impl CompletionProvider for MaskProvider {
    async fn complete(
        &self,
        model_id: &str,
        _messages: &[ChatMessage],
        _temperature: f32,
    ) -> Result<Completion, ProviderFailure> {
        if model_id.starts_with("fail") {
            Err(ProviderFailure::transport("scripted failure"))
        } else {
            Ok(Completion::text(format!("reply from {model_id}")))
        }
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // ========================================================================
    // GraphAnalyzer Properties
    // ========================================================================

    /// Property: counts equal list lengths and summed property-map sizes
    #[test]
    fn prop_analyzer_counts_match_document(
        nodes in arb_elements(20),
        relationships in arb_elements(20),
    ) {
        let doc = json!({"nodes": to_elements(&nodes), "relationships": to_elements(&relationships)});
        let metrics = GraphAnalyzer::analyze(&doc).unwrap();

        prop_assert_eq!(metrics.node_count, nodes.len());
        prop_assert_eq!(metrics.relationship_count, relationships.len());
        prop_assert_eq!(metrics.node_property_count, property_total(&nodes));
        prop_assert_eq!(metrics.relationship_property_count, property_total(&relationships));
    }

    /// Property: analysis is idempotent
    #[test]
    fn prop_analyzer_idempotent(nodes in arb_elements(10)) {
        let doc = json!({"nodes": to_elements(&nodes)});
        prop_assert_eq!(GraphAnalyzer::analyze(&doc).unwrap(), GraphAnalyzer::analyze(&doc).unwrap());
    }

    /// Property: unrelated top-level keys never change the metrics
    #[test]
    fn prop_analyzer_ignores_extra_keys(nodes in arb_elements(10), extra in "[a-z]{1,8}") {
        prop_assume!(extra != "nodes" && extra != "relationships");
        let plain = json!({"nodes": to_elements(&nodes)});
        let mut noisy = plain.clone();
        noisy[extra.as_str()] = json!([1, 2, 3]);
        prop_assert_eq!(GraphAnalyzer::analyze(&plain).unwrap(), GraphAnalyzer::analyze(&noisy).unwrap());
    }

    // ========================================================================
    // Token Counting Properties
    // ========================================================================

    /// Property: never more tokens than UTF-8 bytes
    #[test]
    fn prop_tokens_bounded_by_bytes(text in ".{0,200}", tokenizer in arb_tokenizer()) {
        prop_assert!(shared_counter().count_with(&text, tokenizer) <= text.len());
    }

    /// Property: any visible character costs at least one token
    #[test]
    fn prop_visible_text_costs_tokens(text in "[ ]{0,3}[!-~]{1,40}[ ]{0,3}", tokenizer in arb_tokenizer()) {
        prop_assert!(shared_counter().count_with(&text, tokenizer) > 0);
    }

    /// Property: arbitrary model identifiers never break counting
    #[test]
    fn prop_unknown_models_fall_back(model in "[a-z0-9:._-]{0,30}", text in "[a-zA-Z ]{0,80}") {
        let counter = shared_counter();
        let expected = counter.count_with(&text, EncodingTokenCounter::tokenizer(&model));
        prop_assert_eq!(counter.count_tokens(&text, &model), expected);
    }

    // ========================================================================
    // Code Fence Properties
    // ========================================================================

    /// Property: a fenced document unwraps to exactly the document
    #[test]
    fn prop_fence_strips_to_body(body in "[{}\\[\\]a-z0-9:,\" ]{1,60}") {
        let fenced = format!("```json\n{body}\n```");
        prop_assert_eq!(strip_code_fence(&fenced), body.as_str());
    }

    // ========================================================================
    // Status Rollup Properties
    // ========================================================================

    /// Property: completed iff no failures
    #[test]
    fn prop_rollup_completed_iff_no_failures(failures in 0usize..1000) {
        let status = RunStatus::rollup(failures);
        prop_assert_eq!(status == RunStatus::Completed, failures == 0);
        prop_assert_ne!(status, RunStatus::Running);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // ========================================================================
    // Orchestrator Properties
    // ========================================================================

    /// Property: N models in, N results out, in order, with isolated failures
    #[test]
    fn prop_orchestrator_preserves_order_and_isolation(
        mask in proptest::collection::vec(any::<bool>(), 1..8),
    ) {
        let models: Vec<String> = mask
            .iter()
            .enumerate()
            .map(|(i, fails)| if *fails { format!("fail:{i}") } else { format!("ok:{i}") })
            .collect();
        let store = Arc::new(MemoryRunStore::new());
        let orchestrator = Orchestrator::new(
            store.clone(),
            Arc::new(MaskProvider),
            Arc::new(EncodingTokenCounter::new()),
        );

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let result = runtime
            .block_on(orchestrator.run(ExperimentSpec::new("sys", "user", models.clone())))
            .unwrap();

        prop_assert_eq!(result.results.len(), models.len());
        for ((model_result, model), fails) in result.results.iter().zip(&models).zip(&mask) {
            prop_assert_eq!(&model_result.model, model);
            prop_assert_eq!(model_result.status == ModelStatus::Error, *fails);
            prop_assert!(model_result.token_counts.input > 0);
            if *fails {
                prop_assert_eq!(model_result.token_counts.output, 0);
            }
        }

        let expected = if mask.iter().any(|f| *f) { RunStatus::Error } else { RunStatus::Completed };
        prop_assert_eq!(result.status, expected);
        prop_assert_eq!(store.get_run(result.experiment_id).unwrap().unwrap().status(), expected);
    }
}
