//! Type-tagged config dispatch
//!
//! This module provides:
//! - The parse context threaded through every (possibly recursive) parse call
//! - The `ConfigParser` trait every transport kind implements
//! - `TypeParser`, a registry routing a config node to the parser for its
//!   `$type` discriminator or URL scheme
//!
//! A parser reports [`ErrorKind::Unsupported`](crate::error::ErrorKind) only
//! when the input is not its own. Once it has claimed a node, every problem
//! is a format, schema or validation error and must not fall through.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::config::{ConfigNode, TYPE_KEY};
use crate::error::{ConfigError, Result};

pub mod base64;
pub mod first_supported;
pub mod protocols;
pub mod uri;

pub use first_supported::{FIRST_SUPPORTED_TYPE, FirstSupportedConfig, parse_first_supported};
pub use uri::{UrlConfig, normalize_url};

/// Deepest nesting accepted before a config is considered runaway
pub const MAX_PARSE_DEPTH: usize = 32;

// ============================================================================
// Parse Context
// ============================================================================

/// Per-call parse state: a cancellation token and the current nesting depth
///
/// Parsing itself never blocks, but parsers delegated to by the registry may
/// (a probe, a lookup). Cancelling the token makes every pending and future
/// dispatch under this context fail with [`ConfigError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct ParseContext {
    cancel: CancellationToken,
    depth: usize,
}

impl ParseContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel, depth: 0 }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Fails if the parse has been cancelled.
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ConfigError::Cancelled);
        }
        Ok(())
    }

    fn nested(&self) -> Result<Self> {
        if self.depth >= MAX_PARSE_DEPTH {
            return Err(ConfigError::validation(format!(
                "config nested deeper than {MAX_PARSE_DEPTH} levels"
            )));
        }
        Ok(Self {
            cancel: self.cancel.clone(),
            depth: self.depth + 1,
        })
    }
}

// ============================================================================
// Config Parser Trait
// ============================================================================

/// Parses one config node into an output value
///
/// The registry the parser was found in is passed along so a parser can
/// resolve sub-configs of the same output type (see first-supported).
pub trait ConfigParser<T>: Send + Sync {
    fn parse(&self, ctx: &ParseContext, registry: &TypeParser<T>, node: ConfigNode) -> Result<T>;
}

impl<T, F> ConfigParser<T> for F
where
    F: Fn(&ParseContext, &TypeParser<T>, ConfigNode) -> Result<T> + Send + Sync,
{
    fn parse(&self, ctx: &ParseContext, registry: &TypeParser<T>, node: ConfigNode) -> Result<T> {
        self(ctx, registry, node)
    }
}

// ============================================================================
// Type Parser Registry
// ============================================================================

/// Registry mapping discriminators (`$type` values and URL schemes) to parsers
///
/// A bare sequence is a list of alternatives and goes to the parser
/// registered as `first-supported`, when there is one.
///
/// Populated once at startup and read-only afterwards; concurrent `parse`
/// calls need no locking.
pub struct TypeParser<T> {
    parsers: HashMap<String, Arc<dyn ConfigParser<T>>>,
    fallback: Option<Arc<dyn ConfigParser<T>>>,
}

impl<T> Default for TypeParser<T> {
    fn default() -> Self {
        Self {
            parsers: HashMap::new(),
            fallback: None,
        }
    }
}

impl<T> fmt::Debug for TypeParser<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeParser")
            .field("discriminators", &self.discriminators())
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

impl<T> TypeParser<T> {
    /// Creates an empty registry without a fallback
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry whose fallback handles nodes that carry no
    /// discriminator: scheme-less strings, maps without `$type`, null.
    pub fn with_fallback<F>(fallback: F) -> Self
    where
        F: Fn(&ParseContext, &TypeParser<T>, ConfigNode) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            parsers: HashMap::new(),
            fallback: Some(Arc::new(fallback)),
        }
    }

    /// Registers a parser closure for a discriminator
    pub fn register<F>(&mut self, discriminator: impl Into<String>, parser: F) -> Result<&mut Self>
    where
        F: Fn(&ParseContext, &TypeParser<T>, ConfigNode) -> Result<T> + Send + Sync + 'static,
    {
        self.register_parser(discriminator, Arc::new(parser))
    }

    /// Registers a shared parser object for a discriminator
    pub fn register_parser(
        &mut self,
        discriminator: impl Into<String>,
        parser: Arc<dyn ConfigParser<T>>,
    ) -> Result<&mut Self> {
        let discriminator = discriminator.into();
        if self.parsers.contains_key(&discriminator) {
            return Err(ConfigError::validation(format!(
                "parser already registered for type '{discriminator}'"
            )));
        }
        trace!("Registering parser for type '{}'", discriminator);
        self.parsers.insert(discriminator, parser);
        Ok(self)
    }

    /// Gets the parser for a discriminator
    pub fn resolve(&self, discriminator: &str) -> Result<Arc<dyn ConfigParser<T>>> {
        self.parsers
            .get(discriminator)
            .cloned()
            .ok_or_else(|| ConfigError::unsupported(format!("config type '{discriminator}'")))
    }

    /// Registered discriminators, sorted
    pub fn discriminators(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.parsers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Parses a node with the parser its discriminator selects
    pub fn parse(&self, ctx: &ParseContext, node: ConfigNode) -> Result<T> {
        ctx.check()?;
        let ctx = ctx.nested()?;

        match node {
            ConfigNode::Map(mut map) => match map.remove(TYPE_KEY) {
                Some(ConfigNode::String(type_name)) => {
                    let parser = self.resolve(&type_name)?;
                    debug!(depth = ctx.depth(), "Dispatching config with type '{}'", type_name);
                    parser.parse(&ctx, self, ConfigNode::Map(map))
                }
                Some(other) => Err(ConfigError::schema(
                    TYPE_KEY,
                    format!("expected a string, got {}", other.kind_name()),
                )),
                None => self.parse_fallback(&ctx, ConfigNode::Map(map)),
            },
            ConfigNode::String(text) => {
                let scheme = uri::extract_scheme(&text)?.map(str::to_owned);
                match scheme {
                    Some(scheme) => {
                        let parser = self.resolve(&scheme)?;
                        debug!(depth = ctx.depth(), "Dispatching URL config with scheme '{}'", scheme);
                        parser.parse(&ctx, self, ConfigNode::String(text))
                    }
                    None => self.parse_fallback(&ctx, ConfigNode::String(text)),
                }
            }
            ConfigNode::Sequence(options) => match self.parsers.get(FIRST_SUPPORTED_TYPE) {
                Some(parser) => {
                    debug!(depth = ctx.depth(), "Dispatching list of {} options", options.len());
                    parser.parse(&ctx, self, ConfigNode::Sequence(options))
                }
                None => self.parse_fallback(&ctx, ConfigNode::Sequence(options)),
            },
            other => self.parse_fallback(&ctx, other),
        }
    }

    fn parse_fallback(&self, ctx: &ParseContext, node: ConfigNode) -> Result<T> {
        match &self.fallback {
            Some(fallback) => {
                trace!("No discriminator on {} config, using fallback", node.kind_name());
                fallback.parse(ctx, self, node)
            }
            None => Err(ConfigError::unsupported(format!(
                "{} config without a type",
                node.kind_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config_yaml;
    use crate::error::ErrorKind;

    fn echo_registry() -> TypeParser<String> {
        let mut registry = TypeParser::with_fallback(|_ctx, _r, node: ConfigNode| {
            Ok(format!("fallback:{}", node.kind_name()))
        });
        registry
            .register("echo", |_ctx, _r, node: ConfigNode| {
                let map = node.as_map().cloned().unwrap_or_default();
                Ok(format!("echo:{}", map.keys().cloned().collect::<Vec<_>>().join(",")))
            })
            .unwrap()
            .register("ss", |_ctx, _r, node: ConfigNode| {
                Ok(format!("url:{}", node.as_str().unwrap_or_default()))
            })
            .unwrap();
        registry
    }

    #[test]
    fn test_dispatch_by_type_strips_type_key() {
        let registry = echo_registry();
        let node = parse_config_yaml("{$type: echo, a: 1, b: 2}").unwrap();
        let out = registry.parse(&ParseContext::new(), node).unwrap();
        assert_eq!(out, "echo:a,b");
    }

    #[test]
    fn test_dispatch_by_url_scheme() {
        let registry = echo_registry();
        let node = ConfigNode::from("ss://abc@example.com:1234");
        let out = registry.parse(&ParseContext::new(), node).unwrap();
        assert_eq!(out, "url:ss://abc@example.com:1234");
    }

    #[test]
    fn test_fallback_for_untyped_nodes() {
        let registry = echo_registry();
        let ctx = ParseContext::new();
        assert_eq!(
            registry.parse(&ctx, ConfigNode::from("example.com:1234")).unwrap(),
            "fallback:string"
        );
        assert_eq!(registry.parse(&ctx, ConfigNode::Null).unwrap(), "fallback:null");
        assert_eq!(
            registry
                .parse(&ctx, ConfigNode::from_pairs([("address", "x:1")]))
                .unwrap(),
            "fallback:map"
        );
    }

    #[test]
    fn test_sequence_dispatches_to_first_supported() {
        let registry = echo_registry();
        let node = parse_config_yaml("[a, b]").unwrap();
        assert_eq!(
            registry.parse(&ParseContext::new(), node.clone()).unwrap(),
            "fallback:sequence"
        );

        let mut registry = echo_registry();
        registry
            .register(FIRST_SUPPORTED_TYPE, |_ctx, _r, node: ConfigNode| {
                Ok(format!("options:{}", node.as_sequence().map_or(0, <[ConfigNode]>::len)))
            })
            .unwrap();
        assert_eq!(registry.parse(&ParseContext::new(), node).unwrap(), "options:2");
    }

    #[test]
    fn test_unknown_type_is_unsupported() {
        let registry = echo_registry();
        let node = parse_config_yaml("$type: unknown-x").unwrap();
        let err = registry.parse(&ParseContext::new(), node).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);

        let err = registry
            .parse(&ParseContext::new(), ConfigNode::from("vmess://abc"))
            .unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_no_fallback_is_unsupported() {
        let registry: TypeParser<String> = TypeParser::new();
        let err = registry
            .parse(&ParseContext::new(), ConfigNode::from("example.com:1234"))
            .unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_non_string_type_is_schema_error() {
        let registry = echo_registry();
        let node = parse_config_yaml("$type: 42").unwrap();
        let err = registry.parse(&ParseContext::new(), node).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
    }

    #[test]
    fn test_malformed_scheme_is_format_error() {
        let registry = echo_registry();
        let err = registry
            .parse(&ParseContext::new(), ConfigNode::from("://example.com"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = echo_registry();
        let err = registry
            .register("echo", |_ctx, _r, _node| Ok(String::new()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(registry.discriminators(), vec!["echo", "ss"]);
    }

    #[test]
    fn test_resolve() {
        let registry = echo_registry();
        assert!(registry.resolve("echo").is_ok());
        assert!(matches!(registry.resolve("nope"), Err(e) if e.is_unsupported()));
    }

    #[test]
    fn test_cancelled_context() {
        let registry = echo_registry();
        let token = CancellationToken::new();
        let ctx = ParseContext::with_cancellation(token.clone());
        token.cancel();
        let err = registry.parse(&ctx, ConfigNode::Null).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_runaway_recursion_is_bounded() {
        let mut registry: TypeParser<String> = TypeParser::new();
        registry
            .register("loop", |ctx, registry, _node| {
                registry.parse(ctx, ConfigNode::from_pairs([("$type", "loop")]))
            })
            .unwrap();
        let err = registry
            .parse(&ParseContext::new(), ConfigNode::from_pairs([("$type", "loop")]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
