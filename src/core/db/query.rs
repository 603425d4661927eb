/// Query Execution Module
///
/// Statement execution for the `Adapter`. Results come back on two channels:
/// `Err(AdapterError)` for empty SQL, missing connections and statements the
/// backend refuses to prepare, and `Ok(ExecOutcome::Failed)` for statements
/// that were prepared but failed while executing.

use crate::core::db::connection::Adapter;
use crate::core::db::value::{Row, Value};
use crate::core::{AdapterError, Result};
use rusqlite::{params_from_iter, Batch, Connection, Statement};
use tracing::{debug, warn};

/// What a successfully prepared statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome {
    /// Execution failed; carries the backend's message
    Failed(String),
    /// Execution succeeded and rows were not requested
    Done,
    /// Execution succeeded; all fetched rows
    Rows(Vec<Row>),
}

impl ExecOutcome {
    /// Boolean view: `false` only for `Failed`.
    pub fn is_success(&self) -> bool {
        !matches!(self, ExecOutcome::Failed(_))
    }

    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            ExecOutcome::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Fetched rows, or an empty list for any other outcome.
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            ExecOutcome::Rows(rows) => rows,
            _ => Vec::new(),
        }
    }
}

impl Adapter {
    /// Prepares and runs `sql` with positional arguments, connecting first if needed.
    ///
    /// With `is_select` set every result row is fetched into
    /// `ExecOutcome::Rows`; otherwise a successful run yields `ExecOutcome::Done`.
    ///
    /// # Errors
    ///
    /// * `AdapterError::InvalidArgument` for empty or blank SQL, before any connect
    /// * connect errors from [`Adapter::connect`]
    /// * `AdapterError::Connection` when no connection is available, the
    ///   statement cannot be prepared, or `sql` holds more than one statement
    pub fn exec(&mut self, sql: &str, is_select: bool, args: &[Value]) -> Result<ExecOutcome> {
        if sql.trim().is_empty() {
            return Err(AdapterError::InvalidArgument("Empty SQL query".to_string()));
        }
        self.connect()?;
        let conn = self.live_connection()?;

        let mut stmt = prepare_single(conn, sql)?;

        debug!(sql, args = args.len(), is_select, "executing statement");
        match run_statement(&mut stmt, is_select, args) {
            Ok(Some(rows)) => Ok(ExecOutcome::Rows(rows)),
            Ok(None) => Ok(ExecOutcome::Done),
            Err(e) => {
                warn!(sql, error = %e, "statement execution failed");
                Ok(ExecOutcome::Failed(e.to_string()))
            }
        }
    }

    /// Runs a query and returns all rows; a failed execution yields no rows.
    pub fn select_all(&mut self, sql: &str, args: &[Value]) -> Result<Vec<Row>> {
        Ok(self.exec(sql, true, args)?.into_rows())
    }

    /// Runs a query and returns its first row, or an empty row when nothing matched.
    pub fn select_one(&mut self, sql: &str, args: &[Value]) -> Result<Row> {
        Ok(self
            .exec(sql, true, args)?
            .into_rows()
            .into_iter()
            .next()
            .unwrap_or_default())
    }
}

/// Prepares the only statement in `sql`. Anything after it other than
/// whitespace and comments is rejected before it can run.
fn prepare_single<'conn>(conn: &'conn Connection, sql: &str) -> Result<Statement<'conn>> {
    let prepare_failed = |reason: String| {
        AdapterError::Connection(format!(
            "Could not prepare the query on the backend: {}",
            reason
        ))
    };

    let mut batch = Batch::new(conn, sql);
    let stmt = batch
        .next()
        .map_err(|e| prepare_failed(e.to_string()))?
        .ok_or_else(|| prepare_failed("no statement found".to_string()))?;
    match batch.next() {
        Ok(None) => Ok(stmt),
        Ok(Some(_)) | Err(_) => Err(prepare_failed(
            "multiple statements in one query".to_string(),
        )),
    }
}

/// Binds `args`, steps the statement to completion and optionally collects rows.
fn run_statement(
    stmt: &mut Statement<'_>,
    fetch: bool,
    args: &[Value],
) -> rusqlite::Result<Option<Vec<Row>>> {
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query(params_from_iter(args.iter()))?;

    if !fetch {
        while rows.next()?.is_some() {}
        return Ok(None);
    }

    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Row::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            record.insert(name.clone(), Value::from(row.get_ref(i)?));
        }
        records.push(record);
    }
    Ok(Some(records))
}
