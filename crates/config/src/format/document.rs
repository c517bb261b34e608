//! JSON and HJSON documents

use super::Format;
use crate::core::{ConfigError, ConfigResult};
use crate::options::{OptionMap, OptionValue, Options};
use serde_json::Value;

/// Decode a document whose top level is an object.
pub fn decode(text: &str, format: Format) -> ConfigResult<OptionMap> {
    let value: Value = match format {
        Format::Json => serde_json::from_str(text)?,
        Format::Hjson => deser_hjson::from_str(text)
            .map_err(|e| ConfigError::decode("hjson", e.to_string()))?,
        Format::Auto => return Err(ConfigError::format_not_supported("auto")),
    };

    match OptionValue::from(value) {
        OptionValue::Node(node) => Ok(node.to_map()),
        other => Err(ConfigError::decode(
            format.extension(),
            format!("top-level value must be an object, found {}", other.type_name()),
        )),
    }
}

/// Encode a tree as a pretty-printed document.
///
/// HJSON is a superset of JSON, so both formats write JSON text.
pub fn encode(options: &Options, format: Format) -> ConfigResult<String> {
    match format {
        Format::Json | Format::Hjson => Ok(serde_json::to_string_pretty(options)?),
        Format::Auto => Err(ConfigError::format_not_supported("auto")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_hjson_with_comments_and_bare_strings() {
        let text = r#"
        {
            # serial settings
            port: /dev/ttyAMA0
            readTimeout: 3
            flags: [1, 2, 3,]
        }
        "#;
        let map = decode(text, Format::Hjson).unwrap();
        assert_eq!(map["port"], OptionValue::from("/dev/ttyAMA0"));
        assert_eq!(map["readTimeout"], OptionValue::from(3));
        assert_eq!(
            map["flags"],
            OptionValue::Array(vec![1.into(), 2.into(), 3.into()])
        );
    }

    #[test]
    fn rejects_non_object_documents() {
        let err = decode("[1, 2]", Format::Json).unwrap_err();
        assert!(matches!(err, ConfigError::Decode { .. }));

        let err = decode("{ not json", Format::Json).unwrap_err();
        assert!(matches!(err, ConfigError::Decode { .. }));
    }

    #[test]
    fn auto_is_not_a_codec() {
        assert!(decode("{}", Format::Auto).is_err());
        assert!(encode(&Options::new(), Format::Auto).is_err());
    }

    #[test]
    fn encodes_pretty_json() {
        let options = Options::new();
        options.set("db.host", "localhost");
        let text = encode(&options, Format::Json).unwrap();
        assert_eq!(text, "{\n  \"db\": {\n    \"host\": \"localhost\"\n  }\n}");
    }
}
