//! HTTP surface over the orchestrator and the schema validator.
//!
//! | Method | Path                           | Handler                 |
//! |--------|--------------------------------|-------------------------|
//! | POST   | `/v1/experiments`              | run an experiment       |
//! | GET    | `/v1/experiments`              | list run summaries      |
//! | GET    | `/v1/experiments/:id`          | run detail              |
//! | DELETE | `/v1/experiments/:id`          | delete run (cascade)    |
//! | POST   | `/v1/validation/validate-json` | schema validation       |
//! | GET    | `/healthz`                     | liveness                |
//!
//! Validation verdicts are always `200`; `is_valid` carries the result.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::experiment::{
    ExperimentResult, ExperimentSpec, Orchestrator, RunDetail, RunId, RunSummary,
};
use crate::validation::{SchemaName, SchemaValidator, ValidationOutcome};
use crate::Error;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Experiment runner and run queries.
    pub orchestrator: Arc<Orchestrator>,
    /// Schema validator.
    pub validator: Arc<SchemaValidator>,
}

impl AppState {
    /// Bundle the handler dependencies.
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>, validator: Arc<SchemaValidator>) -> Self {
        Self {
            orchestrator,
            validator,
        }
    }
}

/// Body of `POST /v1/validation/validate-json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateJsonRequest {
    /// JSON text to validate.
    pub json_str: String,
    /// Schema to validate against.
    pub schema_type: SchemaName,
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route(
            "/v1/experiments",
            post(create_experiment_handler).get(list_experiments_handler),
        )
        .route(
            "/v1/experiments/:id",
            get(get_experiment_handler).delete(delete_experiment_handler),
        )
        .route("/v1/validation/validate-json", post(validate_json_handler))
        .with_state(state)
}

/// Crate error rendered as `{"detail": ..}`.
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::RunNotFound(_) => StatusCode::NOT_FOUND,
            e if e.is_client_error() => StatusCode::UNPROCESSABLE_ENTITY,
            e => {
                error!(error = %e, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

async fn healthz_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn create_experiment_handler(
    State(state): State<AppState>,
    Json(spec): Json<ExperimentSpec>,
) -> Result<Json<ExperimentResult>, ApiError> {
    let result = state.orchestrator.run(spec).await?;
    Ok(Json(result))
}

async fn list_experiments_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<RunSummary>>, ApiError> {
    Ok(Json(state.orchestrator.list_runs()?))
}

async fn get_experiment_handler(
    State(state): State<AppState>,
    Path(id): Path<RunId>,
) -> Result<Json<RunDetail>, ApiError> {
    Ok(Json(state.orchestrator.get_run(id)?))
}

async fn delete_experiment_handler(
    State(state): State<AppState>,
    Path(id): Path<RunId>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator.delete_run(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn validate_json_handler(
    State(state): State<AppState>,
    Json(request): Json<ValidateJsonRequest>,
) -> Json<ValidationOutcome> {
    let outcome = state
        .validator
        .validate(&request.json_str, request.schema_type);
    info!(schema = %request.schema_type, is_valid = outcome.is_valid, "validated document");
    Json(outcome)
}
