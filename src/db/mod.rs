#![forbid(unsafe_code)]

//! Connection lifecycle: driver handle, active database, open transaction.

mod config;
mod connection;
mod context;

pub use config::{
    default_config_path, ClientConfig, ConfigError, ConnectOptions, Profile, ProfileUpdate,
    CONFIG_ENV, DEFAULT_ADDRESS, DEFAULT_DATABASE,
};
pub use connection::{
    Connection, OpenError, CREDENTIALS_EXPIRED, PING, SHOW_CURRENT_USER, SYSTEM_DB,
};
pub use context::ConnectionContext;
