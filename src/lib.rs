//! Client-side layer over a graph database driver.
//!
//! [`Connection`] tracks the driver handle, the active database and the open
//! transaction. [`meta::fetch`] inspects the active database and normalizes
//! the result into [`Metadata`]. [`Stats`] and [`Op`] describe executed
//! statements for presentation.
//!
//! The network driver itself sits behind the traits in [`driver`];
//! [`driver::MemoryDriver`] is a scripted implementation for tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod db;
pub mod driver;
pub mod meta;
pub mod query;
pub mod types;
pub mod view;

pub use db::{ClientConfig, ConnectOptions, Connection, ConnectionContext, OpenError};
pub use meta::{fetch, fetch_metadata, Fetched, Metadata, Schema, Strategy};
pub use query::{Op, Params, Record, Stats, StmtType, Value};
pub use types::{DriverError, GraphError, Result};
