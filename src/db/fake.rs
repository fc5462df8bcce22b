//! Scripted in-memory server used by executor, discovery and login tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::db::client::{QueryRows, ServerConnection, ServerDriver};
use crate::error::{Error, Result};

#[derive(Default)]
pub struct FakeState {
    /// Databases that refuse connections, with the message to fail with.
    pub refuse_connect: HashMap<String, String>,
    /// Result set returned for any SELECT against the keyed database.
    pub select_rows: HashMap<String, QueryRows>,
    /// Substrings that make any statement containing them fail.
    pub fail_matches: Vec<String>,
    /// Affected-row count reported for every non-SELECT statement.
    pub affected: i64,
    pub journal: Mutex<Vec<String>>,
}

impl FakeState {
    fn note(&self, entry: String) {
        self.journal.lock().expect("journal lock").push(entry);
    }
}

pub struct FakeDriver {
    state: Arc<FakeState>,
}

impl FakeDriver {
    pub fn new(state: FakeState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    pub fn journal(&self) -> Vec<String> {
        self.state.journal.lock().expect("journal lock").clone()
    }
}

fn database_of(descriptor: &str) -> String {
    descriptor
        .split(';')
        .find_map(|part| part.trim().strip_prefix("DATABASE="))
        .unwrap_or("")
        .to_string()
}

impl ServerDriver for FakeDriver {
    type Connection = FakeConnection;

    fn open(&self, descriptor: &str) -> Result<FakeConnection> {
        let database = database_of(descriptor);
        if let Some(message) = self.state.refuse_connect.get(&database) {
            return Err(Error::Connection(message.clone()));
        }
        self.state.note(format!("open {database}"));
        Ok(FakeConnection {
            database,
            state: Arc::clone(&self.state),
        })
    }
}

pub struct FakeConnection {
    database: String,
    state: Arc<FakeState>,
}

impl FakeConnection {
    fn check_forced_failure(&self, sql: &str) -> Result<()> {
        for needle in &self.state.fail_matches {
            if sql.contains(needle.as_str()) {
                return Err(Error::Statement(format!("forced failure on '{needle}'")));
            }
        }
        Ok(())
    }
}

impl ServerConnection for FakeConnection {
    fn query(&mut self, sql: &str) -> Result<QueryRows> {
        self.check_forced_failure(sql)?;
        self.state.note(format!("query {}: {sql}", self.database));
        Ok(self
            .state
            .select_rows
            .get(&self.database)
            .cloned()
            .unwrap_or_default())
    }

    fn execute(&mut self, sql: &str) -> Result<i64> {
        self.check_forced_failure(sql)?;
        self.state.note(format!("execute {}: {sql}", self.database));
        Ok(self.state.affected)
    }

    fn commit(&mut self) -> Result<()> {
        self.state.note(format!("commit {}", self.database));
        Ok(())
    }
}
