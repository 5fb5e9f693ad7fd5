//! Scripted in-process driver used for tests and prototyping.
//!
//! Responses are registered per statement text, optionally scoped to one
//! database. Statements without a script succeed with no rows.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::{Connector, Driver, RecordStream, Session, SessionConfig, Transaction};
use crate::db::ConnectOptions;
use crate::query::{Params, Record};
use crate::types::{DriverError, GraphError, Result};

#[derive(Clone, Debug)]
enum Scripted {
    Rows(Vec<Record>),
    Fail(DriverError),
}

#[derive(Default)]
struct State {
    scripts: HashMap<(Option<String>, String), Scripted>,
    executed: Vec<Executed>,
    sessions_opened: usize,
    begun: usize,
    committed: usize,
    rolled_back: usize,
    commit_failure: Option<DriverError>,
    rollback_failure: Option<DriverError>,
    close_failure: Option<DriverError>,
    closed: bool,
}

/// One statement seen by the driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Executed {
    /// Database of the session that ran the statement.
    pub database: String,
    /// Statement text.
    pub query: String,
    /// Whether it ran inside an explicit or managed transaction.
    pub in_transaction: bool,
}

/// Driver answering statements from a script. Clones share the same script
/// and counters, so a test can keep one handle while the connection owns
/// another.
#[derive(Clone, Default)]
pub struct MemoryDriver {
    state: Arc<Mutex<State>>,
}

impl MemoryDriver {
    /// Creates a driver with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `query` with `rows` on every database.
    pub fn respond(&self, query: impl Into<String>, rows: Vec<Record>) -> &Self {
        self.script(None, query.into(), Scripted::Rows(rows))
    }

    /// Answers `query` with `rows` on `database` only.
    pub fn respond_on(
        &self,
        database: impl Into<String>,
        query: impl Into<String>,
        rows: Vec<Record>,
    ) -> &Self {
        self.script(Some(database.into()), query.into(), Scripted::Rows(rows))
    }

    /// Fails `query` with `error` on every database.
    pub fn fail(&self, query: impl Into<String>, error: DriverError) -> &Self {
        self.script(None, query.into(), Scripted::Fail(error))
    }

    /// Fails `query` with `error` on `database` only.
    pub fn fail_on(
        &self,
        database: impl Into<String>,
        query: impl Into<String>,
        error: DriverError,
    ) -> &Self {
        self.script(Some(database.into()), query.into(), Scripted::Fail(error))
    }

    /// Makes the next commit fail.
    pub fn fail_next_commit(&self, error: DriverError) -> &Self {
        self.state.lock().commit_failure = Some(error);
        self
    }

    /// Makes the next rollback fail.
    pub fn fail_next_rollback(&self, error: DriverError) -> &Self {
        self.state.lock().rollback_failure = Some(error);
        self
    }

    /// Makes the next close fail.
    pub fn fail_next_close(&self, error: DriverError) -> &Self {
        self.state.lock().close_failure = Some(error);
        self
    }

    fn script(&self, database: Option<String>, query: String, answer: Scripted) -> &Self {
        self.state.lock().scripts.insert((database, query), answer);
        self
    }

    /// Every statement run so far, in order.
    pub fn executed(&self) -> Vec<Executed> {
        self.state.lock().executed.clone()
    }

    /// Statement texts run so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.state
            .lock()
            .executed
            .iter()
            .map(|e| e.query.clone())
            .collect()
    }

    /// Number of sessions handed out.
    pub fn sessions_opened(&self) -> usize {
        self.state.lock().sessions_opened
    }

    /// Number of explicit transactions begun.
    pub fn begun(&self) -> usize {
        self.state.lock().begun
    }

    /// Number of successful commits.
    pub fn committed(&self) -> usize {
        self.state.lock().committed
    }

    /// Number of successful rollbacks.
    pub fn rolled_back(&self) -> usize {
        self.state.lock().rolled_back
    }

    /// Whether `close` has succeeded.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

fn answer(
    state: &Mutex<State>,
    database: &str,
    query: &str,
    in_transaction: bool,
) -> Result<RecordStream> {
    let mut state = state.lock();
    if state.closed {
        return Err(DriverError::new("driver is closed").into());
    }
    state.executed.push(Executed {
        database: database.to_owned(),
        query: query.to_owned(),
        in_transaction,
    });
    trace!(database, query, "memory driver statement");
    let scripted = state
        .scripts
        .get(&(Some(database.to_owned()), query.to_owned()))
        .or_else(|| state.scripts.get(&(None, query.to_owned())))
        .cloned();
    match scripted {
        Some(Scripted::Rows(rows)) => Ok(RecordStream::from_records(rows)),
        Some(Scripted::Fail(err)) => Err(GraphError::Driver(err)),
        None => Ok(RecordStream::empty()),
    }
}

impl Driver for MemoryDriver {
    fn session(&self, config: &SessionConfig) -> Result<Box<dyn Session>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(DriverError::new("driver is closed").into());
        }
        state.sessions_opened += 1;
        Ok(Box::new(MemorySession {
            state: Arc::clone(&self.state),
            database: config.database.clone(),
        }))
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(err) = state.close_failure.take() {
            return Err(err.into());
        }
        state.closed = true;
        Ok(())
    }
}

struct MemorySession {
    state: Arc<Mutex<State>>,
    database: String,
}

impl Session for MemorySession {
    fn run(&mut self, query: &str, _params: &Params) -> Result<RecordStream> {
        answer(&self.state, &self.database, query, false)
    }

    fn begin_transaction(self: Box<Self>) -> Result<Box<dyn Transaction>> {
        self.state.lock().begun += 1;
        Ok(Box::new(MemoryTransaction {
            state: self.state,
            database: self.database,
        }))
    }

    fn read_transaction(
        &mut self,
        work: &mut dyn FnMut(&mut dyn Transaction) -> Result<()>,
    ) -> Result<()> {
        let mut tx = MemoryTransaction {
            state: Arc::clone(&self.state),
            database: self.database.clone(),
        };
        work(&mut tx)
    }
}

struct MemoryTransaction {
    state: Arc<Mutex<State>>,
    database: String,
}

impl Transaction for MemoryTransaction {
    fn run(&mut self, query: &str, _params: &Params) -> Result<RecordStream> {
        answer(&self.state, &self.database, query, true)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(err) = state.commit_failure.take() {
            return Err(err.into());
        }
        state.committed += 1;
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(err) = state.rollback_failure.take() {
            return Err(err.into());
        }
        state.rolled_back += 1;
        Ok(())
    }
}

/// Connector handing out a shared [`MemoryDriver`].
#[derive(Default)]
pub struct MemoryConnector {
    driver: MemoryDriver,
    failure: Option<DriverError>,
    last: Mutex<Option<ConnectOptions>>,
}

impl MemoryConnector {
    /// Connector returning `driver` on every connect.
    pub fn new(driver: MemoryDriver) -> Self {
        Self {
            driver,
            failure: None,
            last: Mutex::new(None),
        }
    }

    /// Connector whose connect always fails with `error`.
    pub fn failing(error: DriverError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// Options passed to the most recent connect.
    pub fn last_options(&self) -> Option<ConnectOptions> {
        self.last.lock().clone()
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, opts: &ConnectOptions) -> Result<Arc<dyn Driver>> {
        *self.last.lock() = Some(opts.clone());
        if let Some(err) = &self.failure {
            return Err(err.clone().into());
        }
        Ok(Arc::new(self.driver.clone()))
    }
}
