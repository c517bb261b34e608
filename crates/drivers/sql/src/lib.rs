#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Hotconf SQL Driver
//!
//! Keeps the configuration document in a database row. The load query must
//! return a single text column holding the whole document; the store query
//! receives the JSON rendering of the tree as its only bind parameter.
//!
//! Any database sqlx's `Any` driver understands works; the URL scheme of
//! `dsn` picks the backend (`sqlite://`, `postgres://`).
//!
//! Connection properties:
//!
//! | key          | default | meaning                                        |
//! |--------------|---------|------------------------------------------------|
//! | `dsn`        | -       | database URL (required)                        |
//! | `loadQuery`  | -       | query returning the document (required)        |
//! | `storeQuery` | -       | statement persisting the document              |
//! | `cronSpec`   | -       | when to poll for changes; no polling if empty  |
//! | `format`     | json    | `json` or `hjson`                              |
//!
//! # Examples
//!
//! ```rust,no_run
//! use hotconf_config::prelude::*;
//!
//! # async fn example() -> ConfigResult<()> {
//! hotconf_driver_sql::register(DriverRegistry::global())?;
//!
//! let props = Options::new();
//! props.set("dsn", "postgres://app@localhost/app");
//! props.set("loadQuery", "SELECT body FROM settings WHERE name = 'app'");
//! props.set("storeQuery", "UPDATE settings SET body = $1 WHERE name = 'app'");
//! props.set("cronSpec", "*/1 * * * *");
//!
//! let configurator = Configurator::open("database", &props).await?;
//! # Ok(())
//! # }
//! ```

mod connector;

pub use connector::SqlConnector;

use std::sync::Arc;

use async_trait::async_trait;
use hotconf_config::{
    ChangeNotifier, ConfigResult, Connector, Driver, DriverRegistry, Format, Options,
};
use serde::Deserialize;

/// Name the driver registers under
pub const DRIVER_NAME: &str = "database";

/// Connection properties of the SQL driver
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SqlDriverOptions {
    /// Database URL
    pub dsn: String,
    /// Query returning the document as a single text column
    pub load_query: String,
    /// Statement storing the document bound as its only parameter
    pub store_query: String,
    /// Polling schedule
    pub cron_spec: String,
    /// Document format
    pub format: Format,
}

impl Default for SqlDriverOptions {
    fn default() -> Self {
        Self {
            dsn: String::new(),
            load_query: String::new(),
            store_query: String::new(),
            cron_spec: String::new(),
            format: Format::Json,
        }
    }
}

/// Driver producing [`SqlConnector`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlDriver;

#[async_trait]
impl Driver for SqlDriver {
    async fn connect(
        &self,
        props: &Options,
        notifier: Option<ChangeNotifier>,
    ) -> ConfigResult<Box<dyn Connector>> {
        let options: SqlDriverOptions = props.as_struct()?;
        Ok(Box::new(SqlConnector::open(options, notifier).await?))
    }
}

/// Register the SQL driver under [`DRIVER_NAME`]
pub fn register(registry: &DriverRegistry) -> ConfigResult<()> {
    registry.register(DRIVER_NAME, Arc::new(SqlDriver))
}
