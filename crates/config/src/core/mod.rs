//! Core error and result types

pub mod error;
pub mod result;

pub use error::{ConfigError, ParseErrorKind};
pub use result::{ConfigResult, ConfigResultExt};
