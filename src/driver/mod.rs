#![forbid(unsafe_code)]

//! Capabilities this crate consumes from a database driver.
//!
//! The traits here are the seam between the connection manager and an actual
//! wire-level driver. Everything is blocking; cancellation and timeouts belong
//! to the implementation behind the traits.

use std::fmt;
use std::sync::Arc;

use crate::db::ConnectOptions;
use crate::query::{Params, Record};
use crate::types::{GraphError, Result};

/// In-process scripted driver.
pub mod memory;

pub use memory::{Executed, MemoryConnector, MemoryDriver};

/// Credentials handed to the driver when it is created.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum AuthToken {
    /// No authentication.
    #[default]
    None,
    /// Username and password.
    Basic {
        /// Principal.
        username: String,
        /// Secret.
        password: String,
        /// Optional realm.
        realm: Option<String>,
    },
    /// Opaque bearer token (SSO).
    Bearer(String),
}

impl AuthToken {
    /// Basic authentication without realm.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        AuthToken::Basic {
            username: username.into(),
            password: password.into(),
            realm: None,
        }
    }

    /// Bearer token authentication.
    pub fn bearer(token: impl Into<String>) -> Self {
        AuthToken::Bearer(token.into())
    }

    /// Principal carried by the token, if any.
    pub fn principal(&self) -> Option<&str> {
        match self {
            AuthToken::Basic { username, .. } => Some(username),
            _ => None,
        }
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthToken::None => f.write_str("AuthToken::None"),
            AuthToken::Basic {
                username, realm, ..
            } => f
                .debug_struct("AuthToken::Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .field("realm", realm)
                .finish(),
            AuthToken::Bearer(_) => f.write_str("AuthToken::Bearer(<redacted>)"),
        }
    }
}

/// Whether a session routes to readers or writers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AccessMode {
    /// Read-only work.
    Read,
    /// Read/write work.
    #[default]
    Write,
}

/// Parameters for a new session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Database the session is bound to. Empty means the server default.
    pub database: String,
    /// Routing hint.
    pub access_mode: AccessMode,
    /// Records fetched per batch, when the driver supports it.
    pub fetch_size: Option<i64>,
}

impl SessionConfig {
    /// Session bound to `database` with default settings.
    pub fn for_database(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }
}

/// Lazily produced rows of one statement. Each row can be consumed only once.
pub struct RecordStream {
    rows: Box<dyn Iterator<Item = Result<Record>> + Send>,
}

impl RecordStream {
    /// Wraps an arbitrary row iterator.
    pub fn new<I>(rows: I) -> Self
    where
        I: Iterator<Item = Result<Record>> + Send + 'static,
    {
        Self {
            rows: Box::new(rows),
        }
    }

    /// Stream over already materialized rows.
    pub fn from_records(records: Vec<Record>) -> Self {
        Self::new(records.into_iter().map(Ok))
    }

    /// Stream without rows.
    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// Consumes the stream expecting exactly one row.
    pub fn single(mut self) -> Result<Record> {
        let first = self.rows.next().ok_or(GraphError::NoRecord)??;
        if self.rows.next().is_some() {
            return Err(GraphError::MultipleRecords);
        }
        Ok(first)
    }

    /// Drains every row, stopping at the first error.
    pub fn collect_records(self) -> Result<Vec<Record>> {
        self.rows.collect()
    }

    /// Drains the stream discarding rows; surfaces the first error.
    pub fn consume(self) -> Result<()> {
        for row in self.rows {
            row?;
        }
        Ok(())
    }
}

impl Iterator for RecordStream {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}

impl fmt::Debug for RecordStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RecordStream")
    }
}

/// Creates driver handles.
pub trait Connector {
    /// Opens a driver for `opts.address` using `opts.auth`.
    fn connect(&self, opts: &ConnectOptions) -> Result<Arc<dyn Driver>>;
}

/// A driver handle owning the network resources of one server or cluster.
pub trait Driver: Send + Sync {
    /// Opens a new, independent session.
    fn session(&self, config: &SessionConfig) -> Result<Box<dyn Session>>;

    /// Releases every underlying connection.
    fn close(&self) -> Result<()>;
}

/// Short-lived channel used to run statements or host one transaction.
pub trait Session: Send {
    /// Runs a statement in an auto-commit transaction.
    fn run(&mut self, query: &str, params: &Params) -> Result<RecordStream>;

    /// Begins an explicit transaction which takes over the session.
    fn begin_transaction(self: Box<Self>) -> Result<Box<dyn Transaction>>;

    /// Runs `work` inside a managed read transaction.
    fn read_transaction(
        &mut self,
        work: &mut dyn FnMut(&mut dyn Transaction) -> Result<()>,
    ) -> Result<()>;
}

/// Explicit unit of work.
pub trait Transaction: Send {
    /// Runs a statement inside the transaction.
    fn run(&mut self, query: &str, params: &Params) -> Result<RecordStream>;

    /// Commits the transaction.
    fn commit(self: Box<Self>) -> Result<()>;

    /// Rolls the transaction back.
    fn rollback(self: Box<Self>) -> Result<()>;
}
