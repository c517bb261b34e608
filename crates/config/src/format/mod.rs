//! Text formats understood by option trees.
//!
//! Two families live here: the flat escaped `key=value;` text in
//! [`escaped`], and structured documents (JSON and HJSON) in [`document`].

pub mod document;
pub mod escaped;

pub use escaped::{ParseLimits, escape, parse_escaped};

use crate::core::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Structured document format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Format {
    /// Pick the format from the file extension
    #[default]
    Auto,

    /// JSON format
    Json,

    /// HJSON format (comments, unquoted keys, trailing commas)
    Hjson,
}

impl Format {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Auto => "",
            Format::Json => "json",
            Format::Hjson => "hjson",
        }
    }

    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(Format::Json),
            "hjson" => Some(Format::Hjson),
            _ => None,
        }
    }

    /// Detect format from file path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Replace [`Format::Auto`] with the format implied by `path`.
    pub fn resolve(self, path: &Path) -> ConfigResult<Self> {
        match self {
            Format::Auto => Self::from_path(path).ok_or_else(|| {
                let ext = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .unwrap_or("no_extension");
                ConfigError::format_not_supported(ext)
            }),
            concrete => Ok(concrete),
        }
    }
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "auto" => Ok(Format::Auto),
            "json" => Ok(Format::Json),
            "hjson" => Ok(Format::Hjson),
            other => Err(ConfigError::format_not_supported(other)),
        }
    }
}

impl TryFrom<String> for Format {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Format> for String {
    fn from(value: Format) -> Self {
        value.extension().to_string()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Auto => write!(f, "auto"),
            Format::Json => write!(f, "JSON"),
            Format::Hjson => write!(f, "HJSON"),
        }
    }
}
