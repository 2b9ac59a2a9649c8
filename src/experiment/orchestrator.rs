//! Experiment Orchestrator - fan a prompt pair out over a model list
//!
//! Toyota Way: Jidoka (stop the line per model, not for the whole run)
//!
//! Each model is handled by a step function that produces a [`ModelStep`]
//! without touching shared state. The orchestrator persists the step's
//! outputs, then folds it into a [`RunProgress`] accumulator. The final
//! status is a pure function of that accumulator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::{
    ExperimentResult, ExperimentSpec, ModelResult, ModelStatus, OutputRecord, RunDetail, RunId,
    RunStatus, RunStore, RunSummary, TokenCounts,
};
use crate::graph::{strip_code_fence, GraphAnalyzer, GraphMetrics};
use crate::provider::{ChatMessage, Completion, CompletionProvider, ProviderFailure};
use crate::tokens::TokenCounter;
use crate::{Error, Result};

/// Output name carrying a run-level failure.
pub const ERROR_DETAILS_OUTPUT: &str = "error_details";

/// Orchestrator tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    temperature: f32,
    call_timeout: Option<Duration>,
    strip_code_fences: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            call_timeout: None,
            strip_code_fences: true,
        }
    }
}

impl OrchestratorConfig {
    /// Deterministic decoding, no timeout, code fences stripped.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sampling temperature passed to every provider call.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Bound each provider call; an expired call is a provider failure.
    #[must_use]
    pub const fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Whether to unwrap Markdown code fences before graph analysis.
    #[must_use]
    pub const fn with_strip_code_fences(mut self, strip: bool) -> Self {
        self.strip_code_fences = strip;
        self
    }

    /// Get the temperature.
    #[must_use]
    pub const fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Get the per-call timeout.
    #[must_use]
    pub const fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout
    }

    /// Get the code-fence setting.
    #[must_use]
    pub const fn strip_code_fences(&self) -> bool {
        self.strip_code_fences
    }
}

/// Everything one model contributes to a run.
#[derive(Debug, Clone)]
struct ModelStep {
    result: ModelResult,
    outputs: Vec<OutputRecord>,
    enrichment_skipped: bool,
}

/// Fold state across model steps.
#[derive(Debug, Default)]
struct RunProgress {
    results: Vec<ModelResult>,
    failures: usize,
    skipped_enrichments: usize,
}

impl RunProgress {
    fn merge(mut self, step: ModelStep) -> Self {
        if !step.result.is_success() {
            self.failures += 1;
        }
        if step.enrichment_skipped {
            self.skipped_enrichments += 1;
        }
        self.results.push(step.result);
        self
    }

    const fn status(&self) -> RunStatus {
        RunStatus::rollup(self.failures)
    }
}

/// Runs experiments against a store, a completion provider and a token
/// counter.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use llm_eval::experiment::{ExperimentSpec, MemoryRunStore, Orchestrator};
/// use llm_eval::provider::{OpenAiProvider, ProviderRouter};
/// use llm_eval::tokens::EncodingTokenCounter;
///
/// # async fn demo() -> llm_eval::Result<()> {
/// let router = ProviderRouter::new().register("openai", Arc::new(OpenAiProvider::new("sk-...")));
/// let orchestrator = Orchestrator::new(
///     Arc::new(MemoryRunStore::new()),
///     Arc::new(router),
///     Arc::new(EncodingTokenCounter::new()),
/// );
/// let spec = ExperimentSpec::new("You are terse.", "Tell me a joke.", ["openai:gpt-4o-mini"]);
/// let result = orchestrator.run(spec).await?;
/// println!("run {} finished {}", result.experiment_id, result.status);
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator {
    store: Arc<dyn RunStore>,
    provider: Arc<dyn CompletionProvider>,
    tokens: Arc<dyn TokenCounter>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create an orchestrator with the default configuration.
    #[must_use]
    pub fn new(
        store: Arc<dyn RunStore>,
        provider: Arc<dyn CompletionProvider>,
        tokens: Arc<dyn TokenCounter>,
    ) -> Self {
        Self {
            store,
            provider,
            tokens,
            config: OrchestratorConfig::default(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run one experiment.
    ///
    /// Models are invoked sequentially in submission order. A failing model
    /// is recorded and marks the run `ERROR`, but never stops the others.
    /// A failure outside the per-model boundary is recorded against the
    /// run and reported in `error_details` with no model results.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSpec` for a spec that breaks its invariants,
    /// or the store's error if the run record could not be created.
    pub async fn run(&self, spec: ExperimentSpec) -> Result<ExperimentResult> {
        spec.validate()?;

        let run_id = self
            .store
            .create_run(spec.name.as_deref(), spec.description.as_deref())?;
        info!(run_id, models = spec.models.len(), "experiment started");

        match self.execute(run_id, &spec).await {
            Ok(progress) => {
                let status = progress.status();
                info!(
                    run_id,
                    %status,
                    failures = progress.failures,
                    skipped_enrichments = progress.skipped_enrichments,
                    "experiment finished"
                );
                Ok(ExperimentResult {
                    experiment_id: run_id,
                    experiment_config: spec,
                    results: progress.results,
                    status,
                    error_details: None,
                    skipped_enrichments: progress.skipped_enrichments,
                })
            }
            Err(e) => Ok(self.fail_run(run_id, spec, &e)),
        }
    }

    /// Detail view of one run.
    ///
    /// # Errors
    ///
    /// Returns `Error::RunNotFound` if the store has no such run.
    pub fn get_run(&self, run_id: RunId) -> Result<RunDetail> {
        self.store
            .get_run(run_id)?
            .map(|run| RunDetail::from(&run))
            .ok_or(Error::RunNotFound(run_id))
    }

    /// Summaries of every run, ordered by identifier.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub fn list_runs(&self) -> Result<Vec<RunSummary>> {
        Ok(self
            .store
            .list_runs()?
            .iter()
            .map(RunSummary::from)
            .collect())
    }

    /// Delete a run with its parameters and outputs.
    ///
    /// # Errors
    ///
    /// Returns `Error::RunNotFound` if the store has no such run.
    pub fn delete_run(&self, run_id: RunId) -> Result<()> {
        if self.store.delete_run(run_id)? {
            self.store.commit()?;
            info!(run_id, "experiment deleted");
            Ok(())
        } else {
            Err(Error::RunNotFound(run_id))
        }
    }

    async fn execute(&self, run_id: RunId, spec: &ExperimentSpec) -> Result<RunProgress> {
        self.store.attach_parameters(run_id, &spec.parameters())?;
        self.store.commit()?;

        let messages = spec.messages();
        let mut progress = RunProgress::default();
        for model in &spec.models {
            let step = self.invoke_model(model, &messages).await;

            self.store.attach_outputs(run_id, &step.outputs)?;
            if !step.result.is_success() {
                self.store.set_status(run_id, RunStatus::Error)?;
            }
            self.store.commit()?;

            progress = progress.merge(step);
        }

        self.store.set_status(run_id, progress.status())?;
        self.store.commit()?;
        Ok(progress)
    }

    /// Call one model and derive its result and outputs.
    async fn invoke_model(&self, model: &str, messages: &[ChatMessage]) -> ModelStep {
        let input_tokens: usize = messages
            .iter()
            .map(|m| self.tokens.count_tokens(&m.content, model))
            .sum();

        let started = Instant::now();
        match self.call(model, messages).await {
            Ok(completion) => {
                let elapsed_time = started.elapsed().as_secs_f64();
                let text = completion.text;
                let token_counts =
                    TokenCounts::new(input_tokens, self.tokens.count_tokens(&text, model));
                debug!(model, elapsed_time, output_tokens = token_counts.output, "model succeeded");

                let mut outputs = vec![
                    OutputRecord::text(format!("{model}_response"), text.as_str()),
                    OutputRecord::float(format!("{model}_elapsed_time"), elapsed_time),
                    OutputRecord::int(format!("{model}_input_tokens"), as_int(token_counts.input)),
                    OutputRecord::int(format!("{model}_output_tokens"), as_int(token_counts.output)),
                    OutputRecord::int(format!("{model}_total_tokens"), as_int(token_counts.total)),
                ];

                let graph_metrics = self.graph_metrics(model, &text);
                if let Some(metrics) = &graph_metrics {
                    outputs.extend(metrics.pairs().into_iter().map(|(metric, value)| {
                        OutputRecord::int(format!("{model}_{metric}"), as_int(value))
                    }));
                }

                ModelStep {
                    enrichment_skipped: graph_metrics.is_none(),
                    result: ModelResult {
                        model: model.to_string(),
                        status: ModelStatus::Success,
                        response: text,
                        elapsed_time,
                        token_counts,
                        graph_metrics,
                    },
                    outputs,
                }
            }
            Err(failure) => {
                let message = failure.render();
                warn!(model, error = %message, "model failed");
                ModelStep {
                    outputs: vec![
                        OutputRecord::text(format!("{model}_error"), message.as_str()),
                        OutputRecord::int(format!("{model}_input_tokens"), as_int(input_tokens)),
                    ],
                    result: ModelResult {
                        model: model.to_string(),
                        status: ModelStatus::Error,
                        response: message,
                        elapsed_time: 0.0,
                        token_counts: TokenCounts::input_only(input_tokens),
                        graph_metrics: None,
                    },
                    enrichment_skipped: false,
                }
            }
        }
    }

    async fn call(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> std::result::Result<Completion, ProviderFailure> {
        let request = self
            .provider
            .complete(model, messages, self.config.temperature);
        match self.config.call_timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .unwrap_or_else(|_| Err(ProviderFailure::timeout(model, limit.as_secs_f64()))),
            None => request.await,
        }
    }

    /// Best-effort structural analysis of a response.
    fn graph_metrics(&self, model: &str, text: &str) -> Option<GraphMetrics> {
        let body = if self.config.strip_code_fences {
            strip_code_fence(text)
        } else {
            text
        };
        let document: Value = match serde_json::from_str(body) {
            Ok(document) => document,
            Err(e) => {
                debug!(model, error = %e, "response is not JSON, skipping graph metrics");
                return None;
            }
        };
        match GraphAnalyzer::analyze(&document) {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                debug!(model, error = %e, "response is not a graph, skipping graph metrics");
                None
            }
        }
    }

    fn fail_run(&self, run_id: RunId, spec: ExperimentSpec, cause: &Error) -> ExperimentResult {
        let details = cause.to_string();
        error!(run_id, error = %details, "experiment failed");

        if let Err(e) = self.record_failure(run_id, &details) {
            warn!(run_id, error = %e, "could not record experiment failure");
        }

        ExperimentResult {
            experiment_id: run_id,
            experiment_config: spec,
            results: Vec::new(),
            status: RunStatus::Error,
            error_details: Some(details),
            skipped_enrichments: 0,
        }
    }

    fn record_failure(&self, run_id: RunId, details: &str) -> Result<()> {
        self.store.set_status(run_id, RunStatus::Error)?;
        self.store
            .attach_outputs(run_id, &[OutputRecord::text(ERROR_DETAILS_OUTPUT, details)])?;
        self.store.commit()
    }
}

fn as_int(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
