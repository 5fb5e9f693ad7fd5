use tracing::debug;

use super::config::ConnectOptions;
use super::connection::{Connection, OpenError};
use crate::driver::Connector;

/// Holder of the default connection.
///
/// Callers that want a "current connection" convenience keep one context and
/// pass it where needed. Opening through the context replaces the previous
/// default; the old one is unregistered before the attempt so a failed open
/// never leaves it active.
#[derive(Debug, Default)]
pub struct ConnectionContext {
    current: Option<Connection>,
}

impl ConnectionContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a connection and registers it as the default on success.
    pub fn open(
        &mut self,
        connector: &dyn Connector,
        opts: &ConnectOptions,
    ) -> Result<&mut Connection, OpenError> {
        if self.current.take().is_some() {
            debug!("previous default connection unregistered");
        }
        let conn = Connection::open(connector, opts)?;
        Ok(self.current.insert(conn))
    }

    /// Registers `conn` as the default, returning the one it replaces.
    pub fn register(&mut self, conn: Connection) -> Option<Connection> {
        self.current.replace(conn)
    }

    /// Whether a default connection exists and has a database selected.
    pub fn is_connected(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|conn| !conn.database().is_empty())
    }

    /// The default connection, regardless of its state.
    ///
    /// # Panics
    ///
    /// Panics if no connection has been registered. Check with
    /// [`Self::is_connected`] or use [`Self::try_get`] when that is a valid
    /// state.
    pub fn get(&self) -> &Connection {
        match &self.current {
            Some(conn) => conn,
            None => panic!("not connected to a graph database"),
        }
    }

    /// Mutable access to the default connection.
    ///
    /// # Panics
    ///
    /// Panics if no connection has been registered.
    pub fn get_mut(&mut self) -> &mut Connection {
        match &mut self.current {
            Some(conn) => conn,
            None => panic!("not connected to a graph database"),
        }
    }

    /// The default connection, if any.
    pub fn try_get(&self) -> Option<&Connection> {
        self.current.as_ref()
    }

    /// Mutable access to the default connection, if any.
    pub fn try_get_mut(&mut self) -> Option<&mut Connection> {
        self.current.as_mut()
    }

    /// Unregisters and returns the default connection.
    pub fn take(&mut self) -> Option<Connection> {
        self.current.take()
    }

    /// Unregisters the default connection without closing it.
    pub fn reset(&mut self) {
        self.current = None;
    }
}
