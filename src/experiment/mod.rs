//! Experiment tracking
//!
//! An experiment fans one prompt pair out over a list of models and keeps
//! the run, its input parameters and per-model outputs in a [`RunStore`].
//!
//! ## Record Overview
//!
//! ```text
//! ExperimentRun (1) ──< ParameterRecord (N) [input snapshot]
//!                   └──< OutputRecord (N)    [<model>_<name>, typed string]
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use llm_eval::experiment::{ExperimentRun, OutputRecord, RunStatus};
//!
//! let mut run = ExperimentRun::new(1, None, None);
//! assert_eq!(run.name(), "Experiment #1");
//!
//! run.attach_outputs([OutputRecord::int("openai:gpt-4o_input_tokens", 12)]);
//! run.set_status(RunStatus::rollup(0));
//! assert_eq!(run.status(), RunStatus::Completed);
//! ```

mod orchestrator;
mod output_record;
mod parameter_record;
mod result;
mod run_record;
mod spec;
mod sqlite;
mod store;

pub use orchestrator::{Orchestrator, OrchestratorConfig, ERROR_DETAILS_OUTPUT};
pub use output_record::{DataType, OutputRecord, OutputValue};
pub use parameter_record::ParameterRecord;
pub use result::{ExperimentResult, ModelResult, ModelStatus, RunDetail, RunSummary, TokenCounts};
pub use run_record::{ExperimentRun, ExperimentRunBuilder, RunId, RunStatus};
pub use spec::ExperimentSpec;
pub use sqlite::SqliteRunStore;
pub use store::{MemoryRunStore, RunStore};
