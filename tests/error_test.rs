//! Tests for error types

use llm_eval::provider::{FailureKind, ProviderFailure, CAUSED_BY};
use llm_eval::Error;

#[test]
fn test_invalid_spec_error() {
    let error = Error::InvalidSpec("at least one model is required".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid experiment spec"));
    assert!(error_str.contains("at least one model"));
    assert!(error.is_client_error());
}

#[test]
fn test_unknown_schema_error() {
    let error = Error::UnknownSchema("invalid_schema".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("invalid_schema"));
    assert!(error_str.contains("graph_format, evaluation_metadata"));
    assert!(error.is_client_error());
}

#[test]
fn test_schema_load_error() {
    let error = Error::SchemaLoad {
        name: "graph_format".to_string(),
        reason: "file not found".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Failed to load schema 'graph_format'"));
    assert!(error_str.contains("file not found"));
    assert!(!error.is_client_error());
}

#[test]
fn test_run_not_found_error() {
    let error = Error::RunNotFound(42);
    assert_eq!(format!("{error}"), "Experiment run 42 not found");
}

#[test]
fn test_storage_error() {
    let error = Error::Storage("database is locked".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Storage error"));
    assert!(error_str.contains("database is locked"));
    assert!(!error.is_client_error());
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    assert!(format!("{error}").contains("IO error"));
}

#[test]
fn test_json_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = json_error.into();
    assert!(format!("{error}").contains("JSON error"));
}

#[test]
fn test_error_is_debug() {
    let error = Error::GraphShape("'nodes' must be a list".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("GraphShape"));
}

// ============================================================================
// Provider failure rendering
// ============================================================================

#[test]
fn test_http_failure_renders_status_and_body() {
    let failure = ProviderFailure::new(FailureKind::Other, "openai completion failed")
        .caused_by(ProviderFailure::http(429, "rate limited"));
    assert_eq!(
        failure.render(),
        format!("openai completion failed{CAUSED_BY}HTTP 429: rate limited")
    );
}

#[test]
fn test_plain_chain_renders_every_cause() {
    let failure = ProviderFailure::new(FailureKind::Other, "outer")
        .caused_by(ProviderFailure::transport("middle").caused_by(ProviderFailure::decode("inner")));
    let rendered = failure.render();
    assert_eq!(rendered.matches(CAUSED_BY).count(), 2);
    assert!(rendered.starts_with("outer"));
    assert!(rendered.ends_with("inner"));
}
