//! Hotconf Config - runtime configuration with pluggable backends
//!
//! This crate provides hierarchical option trees, an escaped `key=value;`
//! text format, a registry of backend drivers and a [`Configurator`] that
//! keeps registered components up to date as the backing store changes.
//!
//! # Example
//!
//! ```rust,no_run
//! use hotconf_config::prelude::*;
//! use std::sync::Arc;
//!
//! struct Database;
//!
//! impl Configurable for Database {
//!     fn configure(&self, section: &Options, first: bool) {
//!         let host = section.get_string("host", "localhost");
//!         let port = section.get_int("port", 5432);
//!         println!("db -> {host}:{port} (first: {first})");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> ConfigResult<()> {
//!     // A driver crate registers itself under a name, e.g. "file".
//!     let props: Options = "fileName=/etc/app/config.json".parse()?;
//!     let configurator = Configurator::open("file", &props).await?;
//!
//!     configurator.register("database", Arc::new(Database)).await;
//!     // ... later
//!     configurator.close().await?;
//!     Ok(())
//! }
//! ```

#![deny(unused_must_use)]
#![warn(missing_docs)]

pub mod configurator;
pub mod core;
pub mod driver;
pub mod duration;
pub mod format;
pub mod options;
pub mod schedule;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use configurator::{Configurable, Configurator, ConfiguratorOptions};
pub use core::{ConfigError, ConfigResult, ConfigResultExt, ParseErrorKind};
pub use driver::{
    ChangeNotifier, ChangeReceiver, ChangeRequest, Connector, Driver, DriverRegistry, SourceEvent,
};
pub use duration::ConfigDuration;
pub use format::{Format, ParseLimits};
pub use options::{OptionMap, OptionValue, Options};
pub use schedule::CronSchedule;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ChangeNotifier, ConfigDuration, ConfigError, ConfigResult, Configurable, Configurator,
        ConfiguratorOptions, Connector, Driver, DriverRegistry, Format, OptionValue, Options,
        SourceEvent,
    };
}
