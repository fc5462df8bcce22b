pub mod batch;
pub mod catalog;
pub mod client;
pub mod connection;
pub mod login;
pub mod mssql;

#[cfg(test)]
pub(crate) mod fake;

pub use batch::{BatchEvent, BatchExecutor, ExecutionOutcome, ResultTable};
pub use client::{QueryRows, ServerConnection, ServerDriver};
pub use connection::ConnectionInfo;
pub use mssql::MssqlDriver;
