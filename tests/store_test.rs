//! Run store tests against both backends

use std::sync::Arc;

use async_trait::async_trait;
use llm_eval::experiment::{
    DataType, ExperimentSpec, MemoryRunStore, Orchestrator, OutputRecord, ParameterRecord,
    RunStatus, RunStore, SqliteRunStore,
};
use llm_eval::provider::{ChatMessage, Completion, CompletionProvider, ProviderFailure};
use llm_eval::tokens::EncodingTokenCounter;
use llm_eval::Error;
use rusqlite::Connection;
use tempfile::TempDir;

struct FixedProvider;

#[async_trait]
impl CompletionProvider for FixedProvider {
    async fn complete(
        &self,
        model_id: &str,
        _messages: &[ChatMessage],
        _temperature: f32,
    ) -> Result<Completion, ProviderFailure> {
        if model_id == "bad:model" {
            return Err(ProviderFailure::http(401, "invalid api key"));
        }
        Ok(Completion::text(r#"{"nodes": [{"properties": {"k": "v"}}]}"#))
    }
}

fn backends() -> Vec<(&'static str, Arc<dyn RunStore>)> {
    vec![
        ("memory", Arc::new(MemoryRunStore::new()) as Arc<dyn RunStore>),
        ("sqlite", Arc::new(SqliteRunStore::open_in_memory().unwrap()) as Arc<dyn RunStore>),
    ]
}

// ============================================================================
// Contract shared by every backend
// ============================================================================

#[test]
fn test_contract_create_attach_status() {
    for (label, store) in backends() {
        let id = store.create_run(None, Some("described")).unwrap();
        let run = store.get_run(id).unwrap().unwrap();
        assert_eq!(run.name(), format!("Experiment #{id}"), "{label}");
        assert_eq!(run.description(), Some("described"), "{label}");
        assert_eq!(run.status(), RunStatus::Running, "{label}");

        store
            .attach_parameters(id, &[ParameterRecord::text("user_prompt", "hi")])
            .unwrap();
        store
            .attach_outputs(id, &[OutputRecord::int("a_total_tokens", 3)])
            .unwrap();
        store
            .attach_outputs(id, &[OutputRecord::text("a_response", "ok")])
            .unwrap();
        store.set_status(id, RunStatus::Error).unwrap();
        store.commit().unwrap();

        let run = store.get_run(id).unwrap().unwrap();
        let names: Vec<&str> = run.outputs().iter().map(OutputRecord::name).collect();
        assert_eq!(names, ["a_total_tokens", "a_response"], "{label}");
        assert_eq!(run.outputs()[0].datatype(), DataType::Int, "{label}");
        assert_eq!(run.status(), RunStatus::Error, "{label}");
    }
}

#[test]
fn test_contract_unknown_run() {
    for (label, store) in backends() {
        assert!(store.get_run(404).unwrap().is_none(), "{label}");
        assert!(!store.delete_run(404).unwrap(), "{label}");
        assert!(
            matches!(store.set_status(404, RunStatus::Error), Err(Error::RunNotFound(404))),
            "{label}"
        );
        assert!(
            matches!(
                store.attach_outputs(404, &[OutputRecord::text("x", "y")]),
                Err(Error::RunNotFound(404))
            ),
            "{label}"
        );
        store.commit().unwrap();
    }
}

#[test]
fn test_contract_list_ordered_and_delete() {
    for (label, store) in backends() {
        let a = store.create_run(Some("a"), None).unwrap();
        let b = store.create_run(Some("b"), None).unwrap();
        let names: Vec<String> = store
            .list_runs()
            .unwrap()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, ["a", "b"], "{label}");

        assert!(store.delete_run(a).unwrap(), "{label}");
        store.commit().unwrap();
        let remaining: Vec<i64> = store.list_runs().unwrap().iter().map(|r| r.id()).collect();
        assert_eq!(remaining, [b], "{label}");
    }
}

// ============================================================================
// SQLite durability
// ============================================================================

#[tokio::test]
async fn test_sqlite_run_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("runs.db");

    let id = {
        let orchestrator = Orchestrator::new(
            Arc::new(SqliteRunStore::open(&path).unwrap()),
            Arc::new(FixedProvider),
            Arc::new(EncodingTokenCounter::new()),
        );
        let spec = ExperimentSpec::new("sys", "user", ["good:model", "bad:model"]).with_name("durable");
        let result = orchestrator.run(spec).await.unwrap();
        assert_eq!(result.status, RunStatus::Error);
        assert!(result.results[1].response.contains("HTTP 401: invalid api key"));
        result.experiment_id
    };

    let store = SqliteRunStore::open(&path).unwrap();
    let run = store.get_run(id).unwrap().unwrap();
    assert_eq!(run.name(), "durable");
    assert_eq!(run.status(), RunStatus::Error);
    assert_eq!(run.parameters().len(), 3);
    assert_eq!(run.output("good:model_node_count").unwrap().value(), "1");
    assert_eq!(run.output("good:model_node_property_count").unwrap().value(), "1");
    assert!(run.output("bad:model_error").is_some());
}

#[test]
fn test_sqlite_delete_cascades_to_children() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cascade.db");

    let store = SqliteRunStore::open(&path).unwrap();
    let id = store.create_run(None, None).unwrap();
    store
        .attach_parameters(id, &[ParameterRecord::text("models", "a:b")])
        .unwrap();
    store
        .attach_outputs(id, &[OutputRecord::text("a:b_response", "hi")])
        .unwrap();
    store.commit().unwrap();
    assert!(store.delete_run(id).unwrap());
    store.commit().unwrap();
    drop(store);

    let conn = Connection::open(&path).unwrap();
    let count = |table: &str| -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    };
    assert_eq!(count("experiment_runs"), 0);
    assert_eq!(count("parameters"), 0);
    assert_eq!(count("experiment_outputs"), 0);
}
