//! SQLite-backed run store.
//!
//! Three tables mirror the record hierarchy. Child rows reference their
//! run with `ON DELETE CASCADE`, so deleting a run removes its parameters
//! and outputs. Attach and status writes open a transaction lazily;
//! `commit` closes it. Each write runs under its own savepoint, so a
//! write that fails partway leaves none of its rows behind while earlier
//! uncommitted writes are kept.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::{
    DataType, ExperimentRun, OutputRecord, ParameterRecord, RunId, RunStatus, RunStore,
};
use crate::{Error, Result};

const SCHEMA: &str = r"
    CREATE TABLE IF NOT EXISTS experiment_runs (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL,
        timestamp   TEXT NOT NULL,
        description TEXT,
        status      TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS parameters (
        id       INTEGER PRIMARY KEY AUTOINCREMENT,
        run_id   INTEGER NOT NULL REFERENCES experiment_runs(id) ON DELETE CASCADE,
        name     TEXT NOT NULL,
        value    TEXT NOT NULL,
        datatype TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS experiment_outputs (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        run_id          INTEGER NOT NULL REFERENCES experiment_runs(id) ON DELETE CASCADE,
        output_name     TEXT NOT NULL,
        output_value    TEXT NOT NULL,
        output_datatype TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_parameters_run ON parameters(run_id);
    CREATE INDEX IF NOT EXISTS idx_outputs_run ON experiment_outputs(run_id);
";

/// SQLite implementation of [`RunStore`].
pub struct SqliteRunStore {
    conn: Mutex<Connection>,
}

impl SqliteRunStore {
    /// Open (or create) a database file and ensure the schema exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema cannot be created.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        Self::from_connection(Connection::open(db_path)?)
    }

    /// Fresh in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Wrap an existing connection and ensure the schema exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Storage("sqlite connection lock poisoned".into()))
    }

    /// Lock the connection with a write transaction open.
    fn write(&self) -> Result<MutexGuard<'_, Connection>> {
        let conn = self.lock()?;
        if conn.is_autocommit() {
            conn.execute_batch("BEGIN")?;
        }
        Ok(conn)
    }

    /// Run `batch` inside the open transaction, undoing all of it on error.
    fn write_batch<T>(&self, batch: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.write()?;
        let savepoint = conn.savepoint()?;
        let value = batch(&savepoint)?;
        savepoint.commit()?;
        Ok(value)
    }

    fn ensure_run(conn: &Connection, run: RunId) -> Result<()> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT id FROM experiment_runs WHERE id = ?1",
                params![run],
                |row| row.get(0),
            )
            .optional()?;
        found.map(|_| ()).ok_or(Error::RunNotFound(run))
    }

    fn row_to_run(row: &Row<'_>) -> rusqlite::Result<ExperimentRun> {
        let timestamp: String = row.get(2)?;
        let timestamp = DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?
            .with_timezone(&Utc);
        let status: String = row.get(4)?;
        let status = status
            .parse::<RunStatus>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

        Ok(ExperimentRun::builder(row.get(0)?, row.get::<_, String>(1)?)
            .timestamp(timestamp)
            .description(row.get(3)?)
            .status(status)
            .build())
    }

    fn parse_datatype(tag: &str, column: usize) -> rusqlite::Result<DataType> {
        tag.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
    }

    fn load_children(conn: &Connection, run: ExperimentRun) -> Result<ExperimentRun> {
        let mut stmt = conn.prepare(
            "SELECT name, value, datatype FROM parameters WHERE run_id = ?1 ORDER BY id",
        )?;
        let parameters = stmt
            .query_map(params![run.id()], |row| {
                let tag: String = row.get(2)?;
                Ok(ParameterRecord::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    Self::parse_datatype(&tag, 2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            "SELECT output_name, output_value, output_datatype FROM experiment_outputs
             WHERE run_id = ?1 ORDER BY id",
        )?;
        let outputs = stmt
            .query_map(params![run.id()], |row| {
                let tag: String = row.get(2)?;
                Ok(OutputRecord::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    Self::parse_datatype(&tag, 2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut run = run;
        run.attach_parameters(parameters);
        run.attach_outputs(outputs);
        Ok(run)
    }
}

impl RunStore for SqliteRunStore {
    fn create_run(&self, name: Option<&str>, description: Option<&str>) -> Result<RunId> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO experiment_runs (name, timestamp, description, status)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                name.unwrap_or_default(),
                Utc::now().to_rfc3339(),
                description,
                RunStatus::Running.as_str()
            ],
        )?;
        let id = conn.last_insert_rowid();
        if name.is_none() {
            conn.execute(
                "UPDATE experiment_runs SET name = ?1 WHERE id = ?2",
                params![ExperimentRun::default_name(id), id],
            )?;
        }
        debug!(run_id = id, "created experiment run");
        Ok(id)
    }

    fn attach_parameters(&self, run: RunId, parameters: &[ParameterRecord]) -> Result<()> {
        self.write_batch(|conn| {
            Self::ensure_run(conn, run)?;
            let mut stmt = conn.prepare_cached(
                "INSERT INTO parameters (run_id, name, value, datatype) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for p in parameters {
                stmt.execute(params![run, p.name(), p.value(), p.datatype().as_str()])?;
            }
            Ok(())
        })
    }

    fn attach_outputs(&self, run: RunId, outputs: &[OutputRecord]) -> Result<()> {
        self.write_batch(|conn| {
            Self::ensure_run(conn, run)?;
            let mut stmt = conn.prepare_cached(
                "INSERT INTO experiment_outputs (run_id, output_name, output_value, output_datatype)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for o in outputs {
                stmt.execute(params![run, o.name(), o.value(), o.datatype().as_str()])?;
            }
            Ok(())
        })
    }

    fn set_status(&self, run: RunId, status: RunStatus) -> Result<()> {
        self.write_batch(|conn| {
            let changed = conn.execute(
                "UPDATE experiment_runs SET status = ?1 WHERE id = ?2",
                params![status.as_str(), run],
            )?;
            if changed == 0 {
                return Err(Error::RunNotFound(run));
            }
            Ok(())
        })
    }

    fn commit(&self) -> Result<()> {
        let conn = self.lock()?;
        if !conn.is_autocommit() {
            conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn get_run(&self, run: RunId) -> Result<Option<ExperimentRun>> {
        let conn = self.lock()?;
        let header = conn
            .query_row(
                "SELECT id, name, timestamp, description, status FROM experiment_runs
                 WHERE id = ?1",
                params![run],
                Self::row_to_run,
            )
            .optional()?;
        header.map(|r| Self::load_children(&conn, r)).transpose()
    }

    fn list_runs(&self) -> Result<Vec<ExperimentRun>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, timestamp, description, status FROM experiment_runs ORDER BY id",
        )?;
        let headers = stmt
            .query_map([], Self::row_to_run)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        headers
            .into_iter()
            .map(|r| Self::load_children(&conn, r))
            .collect()
    }

    fn delete_run(&self, run: RunId) -> Result<bool> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM experiment_runs WHERE id = ?1", params![run])?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_run_with_children() {
        let store = SqliteRunStore::open_in_memory().unwrap();
        let id = store.create_run(Some("sqlite"), Some("desc")).unwrap();
        store
            .attach_parameters(id, &[ParameterRecord::text("system_prompt", "be brief")])
            .unwrap();
        store
            .attach_outputs(
                id,
                &[
                    OutputRecord::text("m_response", "ahoy"),
                    OutputRecord::float("m_elapsed_time", 0.5),
                ],
            )
            .unwrap();
        store.set_status(id, RunStatus::Completed).unwrap();
        store.commit().unwrap();

        let run = store.get_run(id).unwrap().unwrap();
        assert_eq!(run.name(), "sqlite");
        assert_eq!(run.description(), Some("desc"));
        assert_eq!(run.status(), RunStatus::Completed);
        assert_eq!(run.parameters().len(), 1);
        assert_eq!(run.outputs()[1].datatype(), DataType::Float);
    }

    #[test]
    fn test_default_name() {
        let store = SqliteRunStore::open_in_memory().unwrap();
        let id = store.create_run(None, None).unwrap();
        let run = store.get_run(id).unwrap().unwrap();
        assert_eq!(run.name(), format!("Experiment #{id}"));
    }

    #[test]
    fn test_missing_run() {
        let store = SqliteRunStore::open_in_memory().unwrap();
        assert!(store.get_run(7).unwrap().is_none());
        assert!(matches!(
            store.set_status(7, RunStatus::Error),
            Err(Error::RunNotFound(7))
        ));
        assert!(matches!(
            store.attach_outputs(7, &[OutputRecord::text("x", "y")]),
            Err(Error::RunNotFound(7))
        ));
    }

    #[test]
    fn test_failed_batch_leaves_no_rows() {
        let store = SqliteRunStore::open_in_memory().unwrap();
        let id = store.create_run(None, None).unwrap();
        store
            .lock()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_poison BEFORE INSERT ON experiment_outputs
                 WHEN NEW.output_name = 'poison'
                 BEGIN SELECT RAISE(ABORT, 'poisoned output'); END;",
            )
            .unwrap();

        store
            .attach_outputs(id, &[OutputRecord::text("kept", "before")])
            .unwrap();
        let failed = store.attach_outputs(
            id,
            &[
                OutputRecord::text("half_written", "x"),
                OutputRecord::text("poison", "y"),
            ],
        );
        assert!(matches!(failed, Err(Error::Sqlite(_))));

        store.set_status(id, RunStatus::Error).unwrap();
        store
            .attach_outputs(id, &[OutputRecord::text("error_details", "boom")])
            .unwrap();
        store.commit().unwrap();

        let run = store.get_run(id).unwrap().unwrap();
        let names: Vec<&str> = run.outputs().iter().map(OutputRecord::name).collect();
        assert_eq!(names, ["kept", "error_details"]);
        assert_eq!(run.status(), RunStatus::Error);
    }

    #[test]
    fn test_delete_cascades_to_children() {
        let store = SqliteRunStore::open_in_memory().unwrap();
        let id = store.create_run(None, None).unwrap();
        store
            .attach_outputs(id, &[OutputRecord::text("m_response", "x")])
            .unwrap();
        store.commit().unwrap();

        assert!(store.delete_run(id).unwrap());
        let conn = store.lock().unwrap();
        let orphans: i64 = conn
            .query_row("SELECT COUNT(*) FROM experiment_outputs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }
}
