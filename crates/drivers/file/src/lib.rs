#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Hotconf File Driver
//!
//! Loads and stores configuration documents (JSON or HJSON) on the local
//! file system and reports edits to the owning configurator.
//!
//! File system events are collected into a small bounded queue. Every
//! `eventDelay` the queue is drained and only the latest event is
//! reported, so a burst of writes causes a single reload.
//!
//! Connection properties:
//!
//! | key              | default | meaning                               |
//! |------------------|---------|---------------------------------------|
//! | `fileName`       | -       | document path (required)              |
//! | `format`         | auto    | `json`, `hjson` or by file extension  |
//! | `eventDelay`     | `2s`    | how often queued events are drained   |
//! | `eventQueueSize` | `10`    | events kept between drains            |
//!
//! # Examples
//!
//! ```rust,no_run
//! use hotconf_config::prelude::*;
//!
//! # async fn example() -> ConfigResult<()> {
//! hotconf_driver_file::register(DriverRegistry::global())?;
//!
//! let props: Options = "fileName=/etc/app/config.hjson;eventDelay=500ms".parse()?;
//! let configurator = Configurator::open("file", &props).await?;
//! let db = configurator.get("database").await;
//! # Ok(())
//! # }
//! ```

mod connector;

pub use connector::FileConnector;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use hotconf_config::{
    ChangeNotifier, ConfigDuration, ConfigResult, Connector, Driver, DriverRegistry, Format,
    Options,
};
use serde::Deserialize;

/// Name the driver registers under
pub const DRIVER_NAME: &str = "file";

/// Connection properties of the file driver
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileDriverOptions {
    /// Document format; [`Format::Auto`] picks it from the extension
    pub format: Format,
    /// Path of the document
    pub file_name: PathBuf,
    /// Interval between queue drains
    pub event_delay: ConfigDuration,
    /// Events kept between drains; older ones are discarded
    pub event_queue_size: usize,
}

impl Default for FileDriverOptions {
    fn default() -> Self {
        Self {
            format: Format::Auto,
            file_name: PathBuf::new(),
            event_delay: ConfigDuration::from_secs(2),
            event_queue_size: 10,
        }
    }
}

/// Driver producing [`FileConnector`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct FileDriver;

#[async_trait]
impl Driver for FileDriver {
    async fn connect(
        &self,
        props: &Options,
        notifier: Option<ChangeNotifier>,
    ) -> ConfigResult<Box<dyn Connector>> {
        let options: FileDriverOptions = props.as_struct()?;
        Ok(Box::new(FileConnector::open(options, notifier)?))
    }
}

/// Register the file driver under [`DRIVER_NAME`]
pub fn register(registry: &DriverRegistry) -> ConfigResult<()> {
    registry.register(DRIVER_NAME, Arc::new(FileDriver))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn options_fill_defaults() {
        let props: Options = "fileName=/etc/app.json".parse().unwrap();
        let options: FileDriverOptions = props.as_struct().unwrap();
        assert_eq!(options.file_name, PathBuf::from("/etc/app.json"));
        assert_eq!(options.format, Format::Auto);
        assert_eq!(options.event_delay.get(), Duration::from_secs(2));
        assert_eq!(options.event_queue_size, 10);
    }

    #[test]
    fn options_accept_overrides() {
        let props = Options::new();
        props.set("fileName", "cfg.txt");
        props.set("format", "hjson");
        props.set("eventDelay", 250_000_000u64);
        props.set("eventQueueSize", 3);
        let options: FileDriverOptions = props.as_struct().unwrap();
        assert_eq!(options.format, Format::Hjson);
        assert_eq!(options.event_delay.get(), Duration::from_millis(250));
        assert_eq!(options.event_queue_size, 3);
    }

    #[test]
    fn register_rejects_second_registration() {
        let registry = DriverRegistry::new();
        register(&registry).unwrap();
        assert!(register(&registry).unwrap_err().is_fatal());
        assert_eq!(registry.drivers(), vec![DRIVER_NAME]);
    }
}
