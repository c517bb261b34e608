//! Result type and utilities for configuration operations

use super::error::ConfigError;

/// Standard result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Extension trait for Result types to add configuration-specific utilities
pub trait ConfigResultExt<T> {
    /// Prefix connector errors with context, wrapping anything else into a
    /// connector error for `driver`.
    fn with_driver_context<F>(self, driver: &str, f: F) -> ConfigResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ConfigResultExt<T> for ConfigResult<T> {
    fn with_driver_context<F>(self, driver: &str, f: F) -> ConfigResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| match e {
            ConfigError::Connector { driver, message } => ConfigError::Connector {
                message: format!("{}: {message}", f()),
                driver,
            },
            err @ ConfigError::Fatal { .. } => err,
            other => ConfigError::connector(driver, format!("{}: {other}", f())),
        })
    }
}
