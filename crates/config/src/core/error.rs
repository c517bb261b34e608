//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Configuration error type
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Escaped `key=value;` text is malformed
    #[error("Failed to parse options: {kind}")]
    Parse {
        /// What went wrong
        kind: ParseErrorKind,
    },

    /// Unrecoverable condition such as an oversized input or a broken
    /// driver registration.
    #[error("Fatal configuration error: {message}")]
    Fatal {
        /// Error message
        message: String,
    },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the configuration file
        path: PathBuf,
    },

    /// Configuration file read or write error
    #[error("Failed to access configuration file {path}: {message}")]
    FileAccess {
        /// Path to the configuration file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Structured document could not be decoded
    #[error("Failed to decode {format} document: {message}")]
    Decode {
        /// Format that was being decoded
        format: String,
        /// Error message describing the decode failure
        message: String,
    },

    /// Configuration format not supported
    #[error("Configuration format not supported: {format}")]
    FormatNotSupported {
        /// Format that is not supported
        format: String,
    },

    /// A tree could not be converted into the requested type
    #[error("Configuration type error: {message}")]
    TypeError {
        /// Error message describing the type mismatch
        message: String,
        /// Expected type
        expected: String,
    },

    /// No driver registered under the name
    #[error("Configuration driver not found: {name}")]
    DriverNotFound {
        /// Requested driver name
        name: String,
    },

    /// A backend connector failed
    #[error("Connector error ({driver}): {message}")]
    Connector {
        /// Driver that produced the connector
        driver: String,
        /// Error message
        message: String,
    },

    /// Change watching failed
    #[error("Configuration watch error: {message}")]
    WatchError {
        /// Error message describing the watch failure
        message: String,
    },

    /// The configurator (or its change listener) has been closed
    #[error("Configurator is closed")]
    Closed,
}

/// Reasons an escaped `key=value;` text is rejected
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// `=` seen with nothing before it
    #[error("empty key")]
    EmptyKey,

    /// `;` seen right after `key=`
    #[error("empty value for key '{key}'")]
    EmptyValue {
        /// Key whose value was empty
        key: String,
    },

    /// `=` inside a value or `;` inside a key
    #[error("unescaped '{ch}'")]
    UnescapedDelimiter {
        /// Offending delimiter
        ch: char,
    },
}

impl ConfigError {
    /// Create a parse error
    pub fn parse(kind: ParseErrorKind) -> Self {
        Self::Parse { kind }
    }

    /// Create a fatal error
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a file access error
    pub fn file_access(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::FileAccess {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Map an I/O error for a known path
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::file_not_found(path)
        } else {
            Self::file_access(path, err.to_string())
        }
    }

    /// Create a decode error
    pub fn decode(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Create a format not supported error
    pub fn format_not_supported(format: impl Into<String>) -> Self {
        Self::FormatNotSupported {
            format: format.into(),
        }
    }

    /// Create a type error
    pub fn type_error(message: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::TypeError {
            message: message.into(),
            expected: expected.into(),
        }
    }

    /// Create a driver not found error
    pub fn driver_not_found(name: impl Into<String>) -> Self {
        Self::DriverNotFound { name: name.into() }
    }

    /// Create a connector error
    pub fn connector(driver: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connector {
            driver: driver.into(),
            message: message.into(),
        }
    }

    /// Create a watch error
    pub fn watch_error(message: impl Into<String>) -> Self {
        Self::WatchError {
            message: message.into(),
        }
    }

    /// Whether the error must abort the process rather than be reported
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConfigError::Fatal { .. })
    }
}

impl From<ParseErrorKind> for ConfigError {
    fn from(kind: ParseErrorKind) -> Self {
        ConfigError::parse(kind)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::decode("json", err.to_string())
    }
}
