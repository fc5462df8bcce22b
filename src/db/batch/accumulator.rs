use super::types::ResultTable;

/// Name of the synthetic first column.
pub const DB_NAME_COLUMN: &str = "dbname";

/// Merges SELECT output from every target and statement into one table.
///
/// The header is fixed by the first recorded result set as
/// `["dbname", ...columns]`. Later result sets append positionally even when
/// their column shape differs, which can misalign data under heterogeneous
/// SELECTs; callers are expected to run homogeneous shapes across databases.
/// This positional behaviour is a documented limitation kept on purpose.
#[derive(Debug, Default)]
pub struct ResultAccumulator {
    table: ResultTable,
}

impl ResultAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear everything; called at the start of each batch run.
    pub fn reset(&mut self) {
        self.table = ResultTable::default();
    }

    /// Record one result set, prepending the originating database name to
    /// each row. Fixes the column header on the first call of the batch,
    /// even when the result set carries zero rows.
    pub fn record_rows(&mut self, database: &str, columns: &[String], rows: Vec<Vec<String>>) {
        if self.table.columns.is_empty() {
            self.table.columns = std::iter::once(DB_NAME_COLUMN.to_string())
                .chain(columns.iter().cloned())
                .collect();
        }

        for row in rows {
            let mut prefixed = Vec::with_capacity(row.len() + 1);
            prefixed.push(database.to_string());
            prefixed.extend(row);
            self.table.rows.push(prefixed);
        }
    }

    /// Copy of the current table, safe to hand to a display or export path
    /// while the single writer keeps appending.
    pub fn snapshot(&self) -> ResultTable {
        self.table.clone()
    }

    pub fn has_rows(&self) -> bool {
        !self.table.is_empty()
    }
}
