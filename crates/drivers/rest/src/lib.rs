#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Hotconf REST Driver
//!
//! Fetches the configuration document with `GET uri` and stores it with a
//! JSON `POST` to the same address. Servers rarely push changes, so the
//! connector polls on a cron schedule and reports a change when the body
//! differs from the one last loaded.
//!
//! Connection properties:
//!
//! | key        | default | meaning                                         |
//! |------------|---------|-------------------------------------------------|
//! | `uri`      | -       | document address (required)                     |
//! | `cronSpec` | -       | when to poll for changes; no polling if empty   |
//! | `username` | -       | basic auth user, sent only with a password      |
//! | `password` | -       | basic auth password                             |
//! | `timeout`  | `10s`   | per-request timeout                             |
//! | `format`   | json    | `json`, `hjson`, or `auto` to use the extension |
//!
//! # Examples
//!
//! ```rust,no_run
//! use hotconf_config::prelude::*;
//!
//! # async fn example() -> ConfigResult<()> {
//! hotconf_driver_rest::register(DriverRegistry::global())?;
//!
//! let props: Options = "uri=https://conf.internal/app.json;cronSpec=@every 30s;timeout=5s"
//!     .parse()?;
//! let configurator = Configurator::open("rest", &props).await?;
//! # Ok(())
//! # }
//! ```

mod connector;

pub use connector::RestConnector;

use std::sync::Arc;

use async_trait::async_trait;
use hotconf_config::{
    ChangeNotifier, ConfigDuration, ConfigResult, Connector, Driver, DriverRegistry, Format,
    Options,
};
use serde::Deserialize;

/// Name the driver registers under
pub const DRIVER_NAME: &str = "rest";

/// Connection properties of the REST driver
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RestDriverOptions {
    /// Document format
    pub format: Format,
    /// Document address
    pub uri: String,
    /// Polling schedule
    pub cron_spec: String,
    /// Basic auth user
    pub username: String,
    /// Basic auth password
    pub password: String,
    /// Per-request timeout
    pub timeout: ConfigDuration,
}

impl Default for RestDriverOptions {
    fn default() -> Self {
        Self {
            format: Format::Json,
            uri: String::new(),
            cron_spec: String::new(),
            username: String::new(),
            password: String::new(),
            timeout: ConfigDuration::from_secs(10),
        }
    }
}

impl RestDriverOptions {
    /// Credentials to send, if both parts are set
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if self.username.is_empty() || self.password.is_empty() {
            None
        } else {
            Some((&self.username, &self.password))
        }
    }
}

/// Driver producing [`RestConnector`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct RestDriver;

#[async_trait]
impl Driver for RestDriver {
    async fn connect(
        &self,
        props: &Options,
        notifier: Option<ChangeNotifier>,
    ) -> ConfigResult<Box<dyn Connector>> {
        let options: RestDriverOptions = props.as_struct()?;
        Ok(Box::new(RestConnector::open(options, notifier).await?))
    }
}

/// Register the REST driver under [`DRIVER_NAME`]
pub fn register(registry: &DriverRegistry) -> ConfigResult<()> {
    registry.register(DRIVER_NAME, Arc::new(RestDriver))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn options_fill_defaults() {
        let props: Options = "uri=http://localhost/conf".parse().unwrap();
        let options: RestDriverOptions = props.as_struct().unwrap();
        assert_eq!(options.uri, "http://localhost/conf");
        assert_eq!(options.format, Format::Json);
        assert_eq!(options.timeout.get(), Duration::from_secs(10));
        assert_eq!(options.credentials(), None);
    }

    #[test]
    fn credentials_need_both_parts() {
        let props: Options = "uri=http://h;username=ops;timeout=1500ms".parse().unwrap();
        let options: RestDriverOptions = props.as_struct().unwrap();
        assert_eq!(options.credentials(), None);
        assert_eq!(options.timeout.get(), Duration::from_millis(1500));

        let props: Options = "uri=http://h;username=ops;password=s\\;cret".parse().unwrap();
        let options: RestDriverOptions = props.as_struct().unwrap();
        assert_eq!(options.credentials(), Some(("ops", "s;cret")));
    }
}
