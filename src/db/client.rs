use crate::error::Result;

/// Column headers and stringified rows from one result set. All values are
/// rendered to display strings by the driver; SQL NULL becomes `"NULL"`.
#[derive(Debug, Clone, Default)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// One open session against a single database catalog.
pub trait ServerConnection {
    /// Run a statement expected to return rows.
    fn query(&mut self, sql: &str) -> Result<QueryRows>;

    /// Run a statement expected to affect rows; returns the affected count,
    /// which is driver-defined and may be zero (e.g. for DDL).
    fn execute(&mut self, sql: &str) -> Result<i64>;

    /// Commit whatever transaction the last statement may have opened.
    /// The batch calls this once per non-SELECT statement, so a script is
    /// applied with autocommit-per-statement semantics.
    fn commit(&mut self) -> Result<()>;
}

/// Factory for connections, keyed by an ODBC-style `KEY=value;` descriptor
/// produced by [`ConnectionInfo::connection_string`].
///
/// [`ConnectionInfo::connection_string`]: crate::db::connection::ConnectionInfo::connection_string
pub trait ServerDriver {
    type Connection: ServerConnection;

    fn open(&self, descriptor: &str) -> Result<Self::Connection>;
}
