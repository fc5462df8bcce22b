use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure categories for the runner.
///
/// `Connection` and `Statement` never abort a batch: the executor converts
/// them to log events and moves on to the next target or statement. The
/// remaining variants surface to the shell before or after a run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("statement failed: {0}")]
    Statement(String),

    #[error("database discovery failed: {0}")]
    Discovery(String),

    #[error("profile store error: {0}")]
    Persistence(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn missing_field(field: &str) -> Self {
        Error::Config(format!("missing required connection field: {field}"))
    }
}
