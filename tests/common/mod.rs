#![allow(dead_code)]

use std::sync::Once;

use graphconn::db::ConnectOptions;
use graphconn::driver::{MemoryConnector, MemoryDriver};
use graphconn::Connection;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("graphconn=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .try_init();
    });
}

pub fn connect(driver: &MemoryDriver, database: &str) -> Connection {
    init_tracing();
    let connector = MemoryConnector::new(driver.clone());
    let opts = ConnectOptions::default().database(database);
    Connection::open(&connector, &opts).expect("memory driver connects")
}
