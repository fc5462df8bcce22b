/// Classified result of running one statement against one target database.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    RowsReturned {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    RowsAffected(i64),
    Failed(String),
}

/// Table accumulated across a whole batch. The first column is always the
/// synthetic database-name column; every row carries its originating
/// database in the first slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Events emitted by the batch worker. The core only ever communicates
/// outward through this channel; it never holds a reference to whatever
/// shell consumes the stream.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Log(String),
    Progress { completed: usize, total: usize },
    ResultUpdate(ResultTable),
    Finished,
}
