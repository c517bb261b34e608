//! Flat `key=value;` text with backslash escapes.
//!
//! ```text
//! user=admin;pass=s3cr\;et;greeting=hello\nworld;
//! ```
//!
//! Inside keys and values `\n`, `\r`, `\t`, `\\`, `\=` and `\;` stand for
//! the literal character. A backslash right before a line break joins the
//! lines. The final `;` is optional.

use crate::core::{ConfigError, ConfigResult, ParseErrorKind};
use crate::options::{OptionMap, OptionValue};

/// Size limits enforced while parsing escaped text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    /// Largest accepted input in bytes
    pub max_input_len: usize,
    /// Largest accepted key or value in bytes
    pub max_entry_len: usize,
}

impl ParseLimits {
    /// 100 MiB of input, 1 MiB per key or value
    pub const DEFAULT: Self = Self {
        max_input_len: 100 * 1024 * 1024,
        max_entry_len: 1024 * 1024,
    };
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Key,
    Value,
}

/// Parse escaped text into a flat map of string values.
///
/// Oversized input or entries produce [`ConfigError::Fatal`]; malformed
/// text produces [`ConfigError::Parse`]. Nothing is returned on failure.
pub fn parse_escaped(text: &str, limits: ParseLimits) -> ConfigResult<OptionMap> {
    if text.len() > limits.max_input_len {
        return Err(ConfigError::fatal(format!(
            "options text of {} bytes exceeds the {} byte limit",
            text.len(),
            limits.max_input_len
        )));
    }

    let text = join_continued_lines(text);
    let mut map = OptionMap::new();
    let mut state = State::Key;
    let mut key = String::new();
    let mut buf = String::new();
    let mut escaped = false;

    for ch in text.chars() {
        if escaped {
            escaped = false;
            match ch {
                'n' => buf.push('\n'),
                'r' => buf.push('\r'),
                't' => buf.push('\t'),
                '\\' | '=' | ';' => buf.push(ch),
                other => {
                    buf.push('\\');
                    buf.push(other);
                }
            }
            check_entry(&buf, limits)?;
            continue;
        }

        match (state, ch) {
            (_, '\\') => escaped = true,
            (State::Key, '=') => {
                if buf.is_empty() {
                    return Err(ParseErrorKind::EmptyKey.into());
                }
                key = std::mem::take(&mut buf);
                state = State::Value;
            }
            (State::Value, ';') => {
                if buf.is_empty() {
                    return Err(ParseErrorKind::EmptyValue { key }.into());
                }
                map.insert(
                    std::mem::take(&mut key),
                    OptionValue::String(std::mem::take(&mut buf)),
                );
                state = State::Key;
            }
            (State::Key, ';') | (State::Value, '=') => {
                return Err(ParseErrorKind::UnescapedDelimiter { ch }.into());
            }
            (_, other) => {
                buf.push(other);
                check_entry(&buf, limits)?;
            }
        }
    }

    // Unterminated final value; a dangling key without '=' is dropped.
    if state == State::Value && !buf.is_empty() && !key.is_empty() {
        map.insert(key, OptionValue::String(buf));
    }

    Ok(map)
}

/// Escape `\`, `=` and `;` so the text survives [`parse_escaped`].
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '=' | ';') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Make control characters visible (`\n`, `\r`, `\t`) for display output.
pub fn escape_control(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

fn check_entry(buf: &str, limits: ParseLimits) -> ConfigResult<()> {
    if buf.len() > limits.max_entry_len {
        return Err(ConfigError::fatal(format!(
            "options entry exceeds the {} byte limit",
            limits.max_entry_len
        )));
    }
    Ok(())
}

/// Drop backslash + line break pairs (`\` followed by CRLF, CR or LF).
/// Other escape pairs pass through whole, so `\\` before a line break
/// stays an escaped backslash.
fn join_continued_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.peek() {
                Some('\r') => {
                    chars.next();
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    continue;
                }
                Some('\n') => {
                    chars.next();
                    continue;
                }
                Some(&next) => {
                    chars.next();
                    out.push(ch);
                    out.push(next);
                    continue;
                }
                None => {}
            }
        }
        out.push(ch);
    }
    out
}
