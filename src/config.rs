//! Config node: the normalized tree every parser consumes
//!
//! A [`ConfigNode`] is produced either by the document parser (YAML, which
//! also accepts JSON) or by the URL normalizer. Parsers never look at the
//! source text, only at this tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{ConfigError, Result};

pub mod fields;

pub use fields::FieldReader;

/// Reserved key selecting the parser for a map node
pub const TYPE_KEY: &str = "$type";

/// Opaque configuration fragment
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(untagged)]
pub enum ConfigNode {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Sequence(Vec<ConfigNode>),
    Map(BTreeMap<String, ConfigNode>),
}

impl ConfigNode {
    /// Builds a map node from key/value pairs
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<ConfigNode>,
        I: IntoIterator<Item = (K, V)>,
    {
        ConfigNode::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigNode::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ConfigNode>> {
        match self {
            ConfigNode::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ConfigNode]> {
        match self {
            ConfigNode::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigNode::Null)
    }

    /// Returns the `$type` discriminator of a map node, if any.
    pub fn type_tag(&self) -> Option<&str> {
        self.as_map()?.get(TYPE_KEY)?.as_str()
    }

    /// Human readable name of the node shape, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            ConfigNode::Null => "null",
            ConfigNode::Bool(_) => "bool",
            ConfigNode::Int(_) => "integer",
            ConfigNode::Float(_) => "float",
            ConfigNode::String(_) => "string",
            ConfigNode::Sequence(_) => "sequence",
            ConfigNode::Map(_) => "map",
        }
    }
}

impl From<&str> for ConfigNode {
    fn from(s: &str) -> Self {
        ConfigNode::String(s.to_string())
    }
}

impl From<String> for ConfigNode {
    fn from(s: String) -> Self {
        ConfigNode::String(s)
    }
}

impl From<bool> for ConfigNode {
    fn from(b: bool) -> Self {
        ConfigNode::Bool(b)
    }
}

impl From<i64> for ConfigNode {
    fn from(n: i64) -> Self {
        ConfigNode::Int(n)
    }
}

impl From<Vec<ConfigNode>> for ConfigNode {
    fn from(items: Vec<ConfigNode>) -> Self {
        ConfigNode::Sequence(items)
    }
}

/// Parses YAML (or JSON) text into a config node.
///
/// Blank input yields [`ConfigNode::Null`]. A document that is just a URL,
/// quoted or not, yields a string node.
pub fn parse_config_yaml(text: &str) -> Result<ConfigNode> {
    if text.trim().is_empty() {
        return Ok(ConfigNode::Null);
    }
    trace!("Parsing YAML config document, {} bytes", text.len());
    serde_yaml::from_str(text).map_err(|e| ConfigError::format(format!("invalid YAML: {e}")))
}

/// Parses JSON text into a config node.
pub fn parse_config_json(text: &str) -> Result<ConfigNode> {
    trace!("Parsing JSON config document, {} bytes", text.len());
    serde_json::from_str(text).map_err(|e| ConfigError::format(format!("invalid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_yaml_map() {
        let node = parse_config_yaml(
            r#"
$type: ss
endpoint: example.com:1234
cipher: chacha20-ietf-poly1305
secret: SECRET"#,
        )
        .unwrap();
        assert_eq!(node.type_tag(), Some("ss"));
        let map = node.as_map().unwrap();
        assert_eq!(map["endpoint"].as_str(), Some("example.com:1234"));
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_parse_yaml_bare_url() {
        let node = parse_config_yaml(
            "ss://Y2hhY2hhMjAtaWV0Zi1wb2x5MTMwNTpaTXJSMW92ZmRBaEQ@example.com:4321/#My%20Server",
        )
        .unwrap();
        assert_eq!(
            node.as_str(),
            Some("ss://Y2hhY2hhMjAtaWV0Zi1wb2x5MTMwNTpaTXJSMW92ZmRBaEQ@example.com:4321/#My%20Server")
        );
    }

    #[test]
    fn test_parse_yaml_quoted_url() {
        let node = parse_config_yaml(r#""ss://abc@example.com:4321/#My%20Server""#).unwrap();
        assert_eq!(node.as_str(), Some("ss://abc@example.com:4321/#My%20Server"));
    }

    #[test]
    fn test_parse_yaml_scalars_and_sequences() {
        let node = parse_config_yaml("options: [a, 2, true, 1.5, ~]").unwrap();
        let options = node.as_map().unwrap()["options"].as_sequence().unwrap();
        assert_eq!(options[0], ConfigNode::from("a"));
        assert_eq!(options[1], ConfigNode::Int(2));
        assert_eq!(options[2], ConfigNode::Bool(true));
        assert_eq!(options[3], ConfigNode::Float(1.5));
        assert!(options[4].is_null());
    }

    #[test]
    fn test_parse_yaml_blank_is_null() {
        assert!(parse_config_yaml("  \n").unwrap().is_null());
    }

    #[test]
    fn test_parse_yaml_invalid() {
        let err = parse_config_yaml("a: [unclosed").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_parse_json() {
        let node = parse_config_json(r#"{"$type": "first-supported", "options": []}"#).unwrap();
        assert_eq!(node.type_tag(), Some("first-supported"));
        assert!(parse_config_json("{").is_err());
    }

    #[test]
    fn test_from_pairs_and_kind_name() {
        let node = ConfigNode::from_pairs([("endpoint", "example.com:1234")]);
        assert_eq!(node.kind_name(), "map");
        assert_eq!(node.type_tag(), None);
        assert_eq!(ConfigNode::Null.kind_name(), "null");
    }
}
