mod accumulator;
mod executor;
mod script;
mod types;


pub use accumulator::{ResultAccumulator, DB_NAME_COLUMN};
pub use executor::BatchExecutor;
pub use script::{is_select, split_statements, statement_verb};
pub use types::{BatchEvent, ExecutionOutcome, ResultTable};
