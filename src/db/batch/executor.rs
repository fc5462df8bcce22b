use std::sync::mpsc::Sender;

use crate::db::client::{ServerConnection, ServerDriver};
use crate::db::connection::ConnectionInfo;

use super::accumulator::ResultAccumulator;
use super::script::{is_select, statement_verb};
use super::types::{BatchEvent, ExecutionOutcome, ResultTable};

/// Runs one batch: every statement against every target, strictly
/// sequentially, without ever letting a failure abort the rest of the run.
///
/// A target that refuses connections is skipped with a log line; a statement
/// that fails is skipped with a log line and the remaining statements still
/// execute on the same connection, with no rollback of what came before.
/// Nothing propagates to the caller; `run` cannot fail.
pub struct BatchExecutor {
    accumulator: ResultAccumulator,
}

impl BatchExecutor {
    pub fn new() -> Self {
        Self {
            accumulator: ResultAccumulator::new(),
        }
    }

    /// The accumulated table as of now. After `run` returns this is the
    /// final table of the batch, read by the export path.
    pub fn results(&self) -> ResultTable {
        self.accumulator.snapshot()
    }

    /// Execute `statements` against each of `targets` in order, narrating
    /// everything through `events`. The statement list is the script
    /// snapshot taken at batch start; it is not re-derived mid-run.
    pub fn run<D: ServerDriver>(
        &mut self,
        driver: &D,
        info: &ConnectionInfo,
        targets: &[String],
        statements: &[String],
        events: &Sender<BatchEvent>,
    ) {
        self.accumulator.reset();
        let total = targets.len();

        for (index, target) in targets.iter().enumerate() {
            let _ = events.send(BatchEvent::Log(format!(
                "========== Executing on database: {target} =========="
            )));

            match driver.open(&info.connection_string(target)) {
                Ok(mut connection) => {
                    for (ordinal, statement) in statements.iter().enumerate() {
                        self.run_statement(&mut connection, target, ordinal + 1, statement, events);
                    }
                    let _ = events.send(BatchEvent::Log(format!(
                        "Finished execution on {target}"
                    )));
                }
                Err(err) => {
                    let _ = events.send(BatchEvent::Log(format!("Failed on {target}: {err}")));
                }
            }

            let _ = events.send(BatchEvent::Progress {
                completed: index + 1,
                total,
            });
        }
    }

    fn run_statement<C: ServerConnection>(
        &mut self,
        connection: &mut C,
        target: &str,
        ordinal: usize,
        statement: &str,
        events: &Sender<BatchEvent>,
    ) {
        match Self::execute_one(connection, statement) {
            ExecutionOutcome::RowsReturned { columns, rows } => {
                let count = rows.len();
                self.accumulator.record_rows(target, &columns, rows);
                let _ = events.send(BatchEvent::ResultUpdate(self.accumulator.snapshot()));
                let _ = events.send(BatchEvent::Log(format!(
                    "  SELECT returned {count} row(s)"
                )));
            }
            ExecutionOutcome::RowsAffected(count) => {
                let _ = events.send(BatchEvent::Log(format!(
                    "  {} affected {count} row(s)",
                    statement_verb(statement)
                )));
            }
            ExecutionOutcome::Failed(message) => {
                let _ = events.send(BatchEvent::Log(format!(
                    "  Statement {ordinal} error: {message}"
                )));
            }
        }
    }

    /// Classify and execute a single statement. The SELECT-prefix check is
    /// the documented detection rule; non-SELECT statements commit
    /// immediately and individually.
    fn execute_one<C: ServerConnection>(connection: &mut C, statement: &str) -> ExecutionOutcome {
        if is_select(statement) {
            match connection.query(statement) {
                Ok(result) => ExecutionOutcome::RowsReturned {
                    columns: result.columns,
                    rows: result.rows,
                },
                Err(err) => ExecutionOutcome::Failed(err.to_string()),
            }
        } else {
            let outcome = connection
                .execute(statement)
                .and_then(|count| connection.commit().map(|()| count));
            match outcome {
                Ok(count) => ExecutionOutcome::RowsAffected(count),
                Err(err) => ExecutionOutcome::Failed(err.to_string()),
            }
        }
    }
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new()
    }
}
