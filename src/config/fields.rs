//! Strict, hand-written field decoding for map nodes.
//!
//! Each concrete config shape lists the fields it accepts. Anything else is a
//! schema error, so a typo or a field added by newer configs fails loudly on
//! older code instead of being ignored.

use std::collections::BTreeMap;

use crate::config::{ConfigNode, TYPE_KEY};
use crate::error::{ConfigError, Result};

/// Reads fields out of a map node after checking it against an allow-list
#[derive(Debug)]
pub struct FieldReader<'a> {
    map: &'a BTreeMap<String, ConfigNode>,
}

impl<'a> FieldReader<'a> {
    /// Fails with a format error if `node` is not a map, and with a schema
    /// error if it holds a key outside `allowed`. `$type` is always accepted.
    pub fn new(node: &'a ConfigNode, allowed: &[&str]) -> Result<Self> {
        let map = node.as_map().ok_or_else(|| {
            ConfigError::format(format!("expected a map, got {}", node.kind_name()))
        })?;

        // BTreeMap iteration is sorted, so the reported field is deterministic
        if let Some(unknown) = map
            .keys()
            .find(|key| key.as_str() != TYPE_KEY && !allowed.contains(&key.as_str()))
        {
            return Err(ConfigError::unknown_field(unknown.as_str()));
        }

        Ok(Self { map })
    }

    pub fn node(&self, field: &str) -> Option<&'a ConfigNode> {
        self.map.get(field).filter(|node| !node.is_null())
    }

    pub fn required_node(&self, field: &str) -> Result<&'a ConfigNode> {
        self.node(field)
            .ok_or_else(|| ConfigError::missing_field(field))
    }

    pub fn required_str(&self, field: &str) -> Result<&'a str> {
        let node = self.required_node(field)?;
        expect_str(field, node)
    }

    pub fn optional_str(&self, field: &str) -> Result<Option<&'a str>> {
        self.node(field).map(|node| expect_str(field, node)).transpose()
    }

    pub fn required_sequence(&self, field: &str) -> Result<&'a [ConfigNode]> {
        let node = self.required_node(field)?;
        node.as_sequence().ok_or_else(|| {
            ConfigError::schema(field, format!("expected a sequence, got {}", node.kind_name()))
        })
    }
}

fn expect_str<'a>(field: &str, node: &'a ConfigNode) -> Result<&'a str> {
    node.as_str().ok_or_else(|| {
        ConfigError::schema(field, format!("expected a string, got {}", node.kind_name()))
    })
}
