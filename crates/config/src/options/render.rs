use super::{OptionValue, Options};
use crate::format::escaped::{escape, escape_control};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt::{self, Write};

/// Escaped `key=value;` rendering. Nested nodes appear as `{...}` and
/// arrays as `[a,b]`; both are display-only and do not parse back.
impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.map.read().iter() {
            write!(f, "{}=", escape(key))?;
            write_escaped(f, value)?;
            f.write_char(';')?;
        }
        Ok(())
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, value: &OptionValue) -> fmt::Result {
    match value {
        OptionValue::Null => f.write_str("null"),
        OptionValue::Bool(b) => write!(f, "{b}"),
        OptionValue::Number(n) => write!(f, "{n}"),
        OptionValue::String(s) => f.write_str(&escape(s)),
        OptionValue::Node(node) => write!(f, "{{{node}}}"),
        OptionValue::Array(items) => {
            f.write_char('[')?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_char(',')?;
                }
                write_escaped(f, item)?;
            }
            f.write_char(']')
        }
    }
}

impl Options {
    /// Human-readable rendering with `separator` after every entry.
    ///
    /// Values are written raw except for control characters; the output is
    /// not meant to be parsed back.
    pub fn format(&self, separator: &str) -> String {
        let mut out = String::new();
        for (key, value) in self.map.read().iter() {
            out.push_str(key);
            out.push('=');
            format_value(&mut out, value, separator);
            out.push_str(separator);
        }
        out
    }
}

fn format_value(out: &mut String, value: &OptionValue, separator: &str) {
    match value {
        OptionValue::Null => out.push_str("null"),
        OptionValue::Bool(b) => out.push_str(&b.to_string()),
        OptionValue::Number(n) => out.push_str(&n.to_string()),
        OptionValue::String(s) => out.push_str(&escape_control(s)),
        OptionValue::Node(node) => {
            out.push('{');
            out.push_str(&node.format(separator));
            out.push('}');
        }
        OptionValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                format_value(out, item, separator);
            }
            out.push(']');
        }
    }
}

impl Serialize for Options {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let map = self.map.read();
        let mut state = serializer.serialize_map(Some(map.len()))?;
        for (key, value) in map.iter() {
            state.serialize_entry(key, value)?;
        }
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn display_escapes_delimiters() {
        let options: Options = "pass=a\\;b\\=c;user=root".parse().unwrap();
        assert_eq!(options.to_string(), "pass=a\\;b\\=c;user=root;");

        let reparsed: Options = options.to_string().parse().unwrap();
        assert_eq!(reparsed, options);
    }

    #[rstest]
    #[case("key=value;pass=abcd123s;")]
    #[case("key=value;pass=abcd123s\\;\\ntest;kv=invalid")]
    #[case("a=1;b=2")]
    #[case("eq=a\\=b;slash=C:\\\\temp")]
    #[case("user=ad\\\nmin;host=local\\\r\nhost")]
    #[case("path=C:\\\\temp\\\\\nnext;tab=a\\tb")]
    fn display_parses_back_to_the_same_tree(#[case] input: &str) {
        let parsed: Options = input.parse().unwrap();
        let rendered = parsed.to_string();
        let reparsed: Options = rendered.parse().unwrap();
        assert_eq!(reparsed, parsed, "{rendered}");
    }

    #[test]
    fn display_renders_nested_values() {
        let options = Options::from_json(json!({
            "db": {"port": 5432},
            "tags": ["x", 1],
            "on": true
        }))
        .unwrap();
        assert_eq!(options.to_string(), "db={port=5432;};on=true;tags=[x,1];");
    }

    #[test]
    fn format_uses_separator_and_shows_control_characters() {
        let options = Options::new();
        options.set("motd", "hello\nworld");
        options.set("port", 80);
        assert_eq!(options.format("\n"), "motd=hello\\nworld\nport=80\n");
        assert_eq!(options.format(", "), "motd=hello\\nworld, port=80, ");
    }

    #[test]
    fn as_json_is_pretty() {
        let options = Options::new();
        options.set("a", 1);
        assert_eq!(options.as_json(), "{\n  \"a\": 1\n}");
    }
}
