use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::config::ConnectOptions;
use crate::driver::{
    AccessMode, Connector, Driver, RecordStream, Session, SessionConfig, Transaction,
};
use crate::query::{Params, Record, Value};
use crate::types::{GraphError, Result};

/// Name of the administrative database.
pub const SYSTEM_DB: &str = "system";

/// Read-only statement used to check that a database is reachable.
pub const PING: &str = "CALL db.ping()";

/// Statement returning the current user in its first column.
pub const SHOW_CURRENT_USER: &str = "CALL dbms.showCurrentUser()";

/// Driver title reported when the password must be changed before use.
pub const CREDENTIALS_EXPIRED: &str = "CredentialsExpired";

/// A database connection able to open any number of sessions.
///
/// The connection tracks the active database and at most one open
/// transaction. Methods that touch the transaction take `&mut self`, so a
/// connection has a single logical owner at a time; share it across threads
/// only behind external synchronization.
///
/// # Example
///
/// ```no_run
/// use graphconn::db::{ConnectOptions, Connection};
/// use graphconn::driver::{AuthToken, MemoryConnector, MemoryDriver};
///
/// let connector = MemoryConnector::new(MemoryDriver::new());
/// let opts = ConnectOptions::new("bolt://localhost:7687")
///     .auth(AuthToken::basic("neo4j", "secret"))
///     .database("movies");
/// let mut conn = Connection::open(&connector, &opts)?;
/// let (_tx, created) = conn.transaction()?;
/// assert!(created);
/// conn.commit()?;
/// conn.close()?;
/// # Ok::<(), graphconn::GraphError>(())
/// ```
pub struct Connection {
    driver: Option<Arc<dyn Driver>>,
    user: String,
    database: String,
    tx: Option<Box<dyn Transaction>>,
    params: Params,
    fetch_size: Option<i64>,
}

/// Failure of [`Connection::open`].
///
/// When the driver handle was created but the initial database could not be
/// selected, the connection is handed back so the caller can inspect or
/// close it.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct OpenError {
    /// What went wrong.
    pub source: GraphError,
    /// The partially opened connection, if a driver handle exists.
    pub connection: Option<Box<Connection>>,
}

impl From<OpenError> for GraphError {
    fn from(err: OpenError) -> Self {
        err.source
    }
}

impl Connection {
    /// Wraps an existing driver handle. No database is selected yet.
    pub fn new(driver: Arc<dyn Driver>, opts: &ConnectOptions) -> Self {
        Self {
            driver: Some(driver),
            user: opts.username.clone(),
            database: String::new(),
            tx: None,
            params: Params::new(),
            fetch_size: opts.fetch_size,
        }
    }

    /// Creates a driver through `connector` and selects `opts.database`.
    ///
    /// If the database cannot be reached, the connection handed back in the
    /// error still names it.
    pub fn open(
        connector: &dyn Connector,
        opts: &ConnectOptions,
    ) -> std::result::Result<Self, OpenError> {
        let driver = connector.connect(opts).map_err(|source| OpenError {
            source,
            connection: None,
        })?;
        let mut conn = Self::new(driver, opts);
        conn.database = opts.database.clone();
        match conn.use_database(&opts.database) {
            Ok(()) => {
                info!(
                    address = %opts.address,
                    database = %conn.database,
                    "connection opened"
                );
                Ok(conn)
            }
            Err(source) => {
                warn!(
                    address = %opts.address,
                    database = %opts.database,
                    error = %source,
                    "connection open failed"
                );
                Err(OpenError {
                    source,
                    connection: Some(Box::new(conn)),
                })
            }
        }
    }

    /// Closes the driver and all underlying connections.
    ///
    /// On success the cached transaction, parameters and database name are
    /// cleared. Closing an already closed connection does nothing.
    pub fn close(&mut self) -> Result<()> {
        let Some(driver) = &self.driver else {
            return Ok(());
        };
        driver.close()?;
        info!(database = %self.database, "connection closed");
        self.driver = None;
        self.tx = None;
        self.params.clear();
        self.database.clear();
        Ok(())
    }

    /// Whether the driver handle is still held.
    pub fn is_open(&self) -> bool {
        self.driver.is_some()
    }

    /// Name of the active database; empty when none is selected.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Opens a new session bound to the active database.
    pub fn session(&self) -> Result<Box<dyn Session>> {
        let driver = self.driver.as_ref().ok_or(GraphError::NotConnected)?;
        driver.session(&SessionConfig {
            database: self.database.clone(),
            access_mode: AccessMode::Write,
            fetch_size: self.fetch_size,
        })
    }

    /// Returns the open transaction, beginning one if necessary.
    ///
    /// The flag is `true` when the transaction was created by this call, in
    /// which case the caller is responsible for finishing it.
    pub fn transaction(&mut self) -> Result<(&mut dyn Transaction, bool)> {
        let created = self.tx.is_none();
        if created {
            let tx = self.session()?.begin_transaction()?;
            debug!(database = %self.database, "transaction started");
            self.tx = Some(tx);
        }
        match self.tx.as_mut() {
            Some(tx) => Ok((tx.as_mut(), created)),
            None => Err(GraphError::NotConnected),
        }
    }

    /// Whether a transaction is currently open.
    pub fn has_transaction(&self) -> bool {
        self.tx.is_some()
    }

    /// Commits the open transaction.
    ///
    /// Returns `Ok(false)` if there was nothing to commit. The transaction is
    /// discarded whether or not the commit succeeds.
    pub fn commit(&mut self) -> Result<bool> {
        let Some(tx) = self.tx.take() else {
            return Ok(false);
        };
        match tx.commit() {
            Ok(()) => {
                debug!(database = %self.database, "transaction committed");
                Ok(true)
            }
            Err(err) => {
                warn!(database = %self.database, error = %err, "commit failed");
                Err(err)
            }
        }
    }

    /// Rolls back the open transaction.
    ///
    /// Returns `Ok(false)` if there was nothing to roll back. The transaction
    /// is discarded whether or not the rollback succeeds.
    pub fn rollback(&mut self) -> Result<bool> {
        let Some(tx) = self.tx.take() else {
            return Ok(false);
        };
        match tx.rollback() {
            Ok(()) => {
                debug!(database = %self.database, "transaction rolled back");
                Ok(true)
            }
            Err(err) => {
                warn!(database = %self.database, error = %err, "rollback failed");
                Err(err)
            }
        }
    }

    /// Switches the active database.
    ///
    /// Any open transaction is rolled back first. The new database is checked
    /// and the previous one restored if the check fails, except when the
    /// check fails with expired credentials on the system database, which
    /// remains reachable for changing the password.
    pub fn use_database(&mut self, name: &str) -> Result<()> {
        self.rollback()?;

        let previous = std::mem::replace(&mut self.database, name.to_owned());
        match self.ping() {
            Ok(()) => {
                debug!(from = %previous, to = name, "database selected");
                Ok(())
            }
            Err(err) if name == SYSTEM_DB && err.title() == Some(CREDENTIALS_EXPIRED) => {
                warn!(error = %err, "credentials expired; system database selected anyway");
                Ok(())
            }
            Err(err) => {
                warn!(
                    database = name,
                    restored = %previous,
                    error = %err,
                    "database switch failed"
                );
                self.database = previous;
                Err(err)
            }
        }
    }

    fn ping(&self) -> Result<()> {
        let mut session = self.session()?;
        session.read_transaction(&mut |tx: &mut dyn Transaction| {
            tx.run(PING, &Params::new())?.consume()
        })
    }

    /// Name of the connected user, or an empty string if it cannot be
    /// determined.
    pub fn username(&mut self) -> String {
        match self.try_username() {
            Ok(user) => user,
            Err(err) => {
                warn!(error = %err, "could not determine current user");
                String::new()
            }
        }
    }

    /// Name of the connected user, queried once and cached.
    pub fn try_username(&mut self) -> Result<String> {
        if self.user.is_empty() {
            let record = self.query_single(SHOW_CURRENT_USER, &Params::new())?;
            self.user = record.into_value_at(0)?.into_string("username")?;
        }
        Ok(self.user.clone())
    }

    /// Runs a statement on a fresh session.
    pub fn run(&self, query: &str, params: &Params) -> Result<RecordStream> {
        self.session()?.run(query, params)
    }

    /// Runs a statement on a fresh session and collects every row.
    pub fn query(&self, query: &str, params: &Params) -> Result<Vec<Record>> {
        self.run(query, params)?.collect_records()
    }

    /// Runs a statement on a fresh session expecting exactly one row.
    pub fn query_single(&self, query: &str, params: &Params) -> Result<Record> {
        self.run(query, params)?.single()
    }

    /// Parameters kept for the lifetime of the connection.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Stores a parameter, returning the previous value.
    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.params.insert(name.into(), value.into())
    }

    /// Removes a parameter.
    pub fn remove_param(&mut self, name: &str) -> Option<Value> {
        self.params.remove(name)
    }

    /// Removes all parameters.
    pub fn clear_params(&mut self) {
        self.params.clear();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("open", &self.driver.is_some())
            .field("user", &self.user)
            .field("database", &self.database)
            .field("transaction", &self.tx.is_some())
            .field("params", &self.params.len())
            .finish()
    }
}
