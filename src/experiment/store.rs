//! Run Store - persistence contract for experiment runs
//!
//! The orchestrator only ever talks to [`RunStore`]. Two backends ship:
//! [`MemoryRunStore`] here and [`super::SqliteRunStore`].

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use dashmap::DashMap;

use super::{ExperimentRun, OutputRecord, ParameterRecord, RunId, RunStatus};
use crate::{Error, Result};

/// Persistence contract for runs and their child records.
///
/// Attach operations are append-only and keep order. `commit` is the
/// durability boundary: the orchestrator calls it after the parameter
/// snapshot, after each model's outputs and after the final status.
pub trait RunStore: Send + Sync {
    /// Create a run in `Running` status stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot create the record.
    fn create_run(&self, name: Option<&str>, description: Option<&str>) -> Result<RunId>;

    /// Append parameters to a run.
    ///
    /// # Errors
    ///
    /// Returns `Error::RunNotFound` for an unknown run, or a backend error.
    fn attach_parameters(&self, run: RunId, parameters: &[ParameterRecord]) -> Result<()>;

    /// Append outputs to a run.
    ///
    /// # Errors
    ///
    /// Returns `Error::RunNotFound` for an unknown run, or a backend error.
    fn attach_outputs(&self, run: RunId, outputs: &[OutputRecord]) -> Result<()>;

    /// Overwrite a run's status.
    ///
    /// # Errors
    ///
    /// Returns `Error::RunNotFound` for an unknown run, or a backend error.
    fn set_status(&self, run: RunId, status: RunStatus) -> Result<()>;

    /// Make all writes so far durable.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the writes could not be persisted.
    fn commit(&self) -> Result<()>;

    /// Load a run with its parameters and outputs.
    ///
    /// # Errors
    ///
    /// Returns a backend error; a missing run is `Ok(None)`.
    fn get_run(&self, run: RunId) -> Result<Option<ExperimentRun>>;

    /// All runs ordered by identifier.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    fn list_runs(&self) -> Result<Vec<ExperimentRun>>;

    /// Delete a run together with its parameters and outputs.
    ///
    /// Returns `false` if the run did not exist.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    fn delete_run(&self, run: RunId) -> Result<bool>;
}

/// In-memory run store using a lock-free concurrent hashmap.
///
/// Writes are visible immediately; `commit` only counts durability
/// boundaries so callers can observe them. Data is lost on restart.
#[derive(Debug)]
pub struct MemoryRunStore {
    runs: DashMap<RunId, ExperimentRun>,
    next_id: AtomicI64,
    commits: AtomicU64,
}

impl MemoryRunStore {
    /// Create a new empty store. Identifiers start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            runs: DashMap::new(),
            next_id: AtomicI64::new(1),
            commits: AtomicU64::new(0),
        }
    }

    /// Number of runs in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Number of `commit` calls so far.
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    fn with_run<T>(&self, run: RunId, f: impl FnOnce(&mut ExperimentRun) -> T) -> Result<T> {
        self.runs
            .get_mut(&run)
            .map(|mut entry| f(entry.value_mut()))
            .ok_or(Error::RunNotFound(run))
    }
}

impl Default for MemoryRunStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStore for MemoryRunStore {
    fn create_run(&self, name: Option<&str>, description: Option<&str>) -> Result<RunId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.runs.insert(id, ExperimentRun::new(id, name, description));
        Ok(id)
    }

    fn attach_parameters(&self, run: RunId, parameters: &[ParameterRecord]) -> Result<()> {
        self.with_run(run, |r| r.attach_parameters(parameters.iter().cloned()))
    }

    fn attach_outputs(&self, run: RunId, outputs: &[OutputRecord]) -> Result<()> {
        self.with_run(run, |r| r.attach_outputs(outputs.iter().cloned()))
    }

    fn set_status(&self, run: RunId, status: RunStatus) -> Result<()> {
        self.with_run(run, |r| r.set_status(status))
    }

    fn commit(&self) -> Result<()> {
        self.commits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn get_run(&self, run: RunId) -> Result<Option<ExperimentRun>> {
        Ok(self.runs.get(&run).map(|entry| entry.value().clone()))
    }

    fn list_runs(&self) -> Result<Vec<ExperimentRun>> {
        let mut runs: Vec<ExperimentRun> =
            self.runs.iter().map(|entry| entry.value().clone()).collect();
        runs.sort_by_key(ExperimentRun::id);
        Ok(runs)
    }

    fn delete_run(&self, run: RunId) -> Result<bool> {
        Ok(self.runs.remove(&run).is_some())
    }
}
