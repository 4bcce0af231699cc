//! First-supported fallback combinator
//!
//! `{ $type: first-supported, options: [A, B, C] }` resolves to the first
//! option whose parser claims it. Options are tried strictly in order: an
//! unsupported option is skipped, anything else (success or a real error)
//! ends the search.

use tracing::debug;

use super::ParseContext;
use crate::config::{ConfigNode, FieldReader};
use crate::error::{ConfigError, Result, ResultExt};

/// Discriminator the combinator is registered under
pub const FIRST_SUPPORTED_TYPE: &str = "first-supported";

/// Ordered list of alternative configs; the first supported one wins
#[derive(Debug, Clone, PartialEq)]
pub struct FirstSupportedConfig {
    pub options: Vec<ConfigNode>,
}

impl FirstSupportedConfig {
    /// Decodes `{options: [...]}`, or a bare sequence of options.
    pub fn from_node(node: &ConfigNode) -> Result<Self> {
        if let Some(options) = node.as_sequence() {
            return Ok(Self {
                options: options.to_vec(),
            });
        }
        let reader = FieldReader::new(node, &["options"])?;
        Ok(Self {
            options: reader.required_sequence("options")?.to_vec(),
        })
    }
}

/// Resolves the first option `parse` does not report as unsupported.
///
/// Never calls `parse` on options after the one that decided the outcome.
pub fn parse_first_supported<T, F>(ctx: &ParseContext, node: ConfigNode, mut parse: F) -> Result<T>
where
    F: FnMut(&ParseContext, ConfigNode) -> Result<T>,
{
    let config = FirstSupportedConfig::from_node(&node).at("invalid first-supported config")?;

    if config.options.is_empty() {
        return Err(ConfigError::validation("empty list of options"));
    }

    let total = config.options.len();
    for (index, option) in config.options.into_iter().enumerate() {
        ctx.check()?;
        match parse(ctx, option) {
            Err(e) if e.is_unsupported() => {
                debug!("Option {}/{} not supported, trying next: {}", index + 1, total, e);
            }
            result => {
                debug!("Option {}/{} claimed the config", index + 1, total);
                return result.at(format!("options[{index}]"));
            }
        }
    }

    Err(ConfigError::unsupported("no supported option found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config_yaml;
    use crate::error::ErrorKind;

    /// Parses options shaped `{result: ok|unsupported|invalid, value: n}`
    /// and records which option values were visited.
    fn scripted(visited: &mut Vec<i64>, _ctx: &ParseContext, node: ConfigNode) -> Result<i64> {
        let map = node.as_map().cloned().unwrap_or_default();
        let value = match map.get("value") {
            Some(ConfigNode::Int(n)) => *n,
            _ => -1,
        };
        visited.push(value);
        match map.get("result").and_then(ConfigNode::as_str) {
            Some("ok") => Ok(value),
            Some("invalid") => Err(ConfigError::validation(format!("option {value} is invalid"))),
            _ => Err(ConfigError::unsupported(format!("option {value}"))),
        }
    }

    fn run(yaml: &str) -> (Result<i64>, Vec<i64>) {
        let node = parse_config_yaml(yaml).unwrap();
        let mut visited = Vec::new();
        let result = parse_first_supported(&ParseContext::new(), node, |ctx, option| {
            scripted(&mut visited, ctx, option)
        });
        (result, visited)
    }

    #[test]
    fn test_first_success_wins_and_stops() {
        let (result, visited) = run(
            "options: [{result: unsupported, value: 1}, {result: ok, value: 2}, {result: ok, value: 3}]",
        );
        assert_eq!(result.unwrap(), 2);
        assert_eq!(visited, vec![1, 2]);
    }

    #[test]
    fn test_real_error_stops_search() {
        let (result, visited) = run(
            "options: [{result: invalid, value: 1}, {result: ok, value: 2}]",
        );
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "options[0]: option 1 is invalid");
        assert_eq!(visited, vec![1]);
    }

    #[test]
    fn test_all_unsupported_is_unsupported() {
        let (result, visited) = run(
            "options: [{result: unsupported, value: 1}, {result: unsupported, value: 2}]",
        );
        let err = result.unwrap_err();
        assert!(err.is_unsupported());
        assert!(err.to_string().contains("no supported option found"));
        assert_eq!(visited, vec![1, 2]);
    }

    #[test]
    fn test_empty_list_is_not_unsupported() {
        let (result, visited) = run("options: []");
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(visited.is_empty());
    }

    #[test]
    fn test_malformed_config() {
        let (result, _) = run("choices: [{result: ok, value: 1}]");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Schema);

        let (result, _) = run("options: {result: ok}");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Schema);

        let (result, _) = run("just a string");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Format);
    }

    #[test]
    fn test_bare_sequence_of_options() {
        let (result, visited) = run("[{result: unsupported, value: 7}, {result: ok, value: 8}]");
        assert_eq!(result.unwrap(), 8);
        assert_eq!(visited, vec![7, 8]);
    }
}
