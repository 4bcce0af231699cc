//! Shadowsocks transport parser
//!
//! Accepts the structured form
//!
//! ```yaml
//! $type: ss
//! endpoint: example.com:1234
//! cipher: chacha20-ietf-poly1305
//! secret: SECRET
//! prefix: "HTTP/1.1 "   # optional
//! ```
//!
//! or any `ss://` shorthand URL (see [`crate::parser::uri`]). Both are
//! decoded through the same strict field list; a URL only ever contributes
//! the fields its grammar defines.

use tracing::{debug, trace};

use super::parse_host_port;
use crate::config::{ConfigNode, FieldReader};
use crate::error::{ConfigError, Result, ResultExt};
use crate::parser::{ParseContext, normalize_url};
use crate::transport::{Cipher, Endpoint, Layer, PacketConn, StreamConn, TransportPair};

pub const SHADOWSOCKS_TYPE: &str = "ss";

const FIELDS: &[&str] = &["endpoint", "cipher", "secret", "prefix"];

// ============================================================================
// Config Decoding
// ============================================================================

/// Shadowsocks config as written, before value validation
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowsocksConfig {
    /// `host:port` string, or a nested endpoint config
    pub endpoint: ConfigNode,
    pub cipher: String,
    pub secret: String,
    pub prefix: Option<String>,
}

/// Decodes a Shadowsocks config from a map node or an `ss://` URL string.
pub fn parse_shadowsocks_config(node: &ConfigNode) -> Result<ShadowsocksConfig> {
    match node {
        ConfigNode::String(text) => {
            trace!("Decoding Shadowsocks URL config");
            let normalized = normalize_url(text)?;
            match normalized.type_tag() {
                Some(SHADOWSOCKS_TYPE) => decode_fields(&normalized),
                other => Err(ConfigError::format(format!(
                    "expected an ss:// URL, got scheme {:?}",
                    other.unwrap_or_default()
                ))),
            }
        }
        ConfigNode::Map(_) => {
            if let Some(type_name) = node.type_tag()
                && type_name != SHADOWSOCKS_TYPE
            {
                return Err(ConfigError::format(format!(
                    "expected a Shadowsocks config, got type '{type_name}'"
                )));
            }
            decode_fields(node)
        }
        other => Err(ConfigError::format(format!(
            "Shadowsocks config must be a map or an ss:// URL, got {}",
            other.kind_name()
        ))),
    }
}

fn decode_fields(node: &ConfigNode) -> Result<ShadowsocksConfig> {
    let reader = FieldReader::new(node, FIELDS)?;
    Ok(ShadowsocksConfig {
        endpoint: reader.required_node("endpoint")?.clone(),
        cipher: reader.required_str("cipher")?.to_string(),
        secret: reader.required_str("secret")?.to_string(),
        prefix: reader.optional_str("prefix")?.map(str::to_string),
    })
}

// ============================================================================
// Validation
// ============================================================================

/// Validated Shadowsocks parameters, forwarded to the cipher layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowsocksParams {
    pub cipher: Cipher,
    pub secret: String,
    pub prefix: Option<Vec<u8>>,
}

impl ShadowsocksParams {
    pub fn layer(&self) -> Layer {
        Layer::Shadowsocks {
            cipher: self.cipher,
            secret: self.secret.clone(),
            prefix: self.prefix.clone(),
        }
    }
}

/// Checks cipher, secret and prefix values.
///
/// An unknown cipher is a validation error, never "unsupported": the
/// Shadowsocks parser did claim the config.
pub fn parse_shadowsocks_params(config: &ShadowsocksConfig) -> Result<ShadowsocksParams> {
    let cipher = config.cipher.parse::<Cipher>().at("cipher")?;
    if config.secret.is_empty() {
        return Err(ConfigError::validation("must not be empty").context("secret"));
    }
    let prefix = config
        .prefix
        .as_deref()
        .map(prefix_bytes)
        .transpose()
        .at("prefix")?;

    Ok(ShadowsocksParams {
        cipher,
        secret: config.secret.clone(),
        prefix,
    })
}

/// Converts a prefix string to bytes, one byte per code point.
///
/// Prefixes are byte strings written as text, so every character must be in
/// U+0000..=U+00FF.
fn prefix_bytes(prefix: &str) -> Result<Vec<u8>> {
    prefix
        .chars()
        .map(|c| {
            u8::try_from(u32::from(c)).map_err(|_| {
                ConfigError::validation(format!(
                    "character {c:?} is outside the single-byte range"
                ))
            })
        })
        .collect()
}

// ============================================================================
// Transport
// ============================================================================

/// Builds a Shadowsocks transport over the endpoint the config names.
///
/// The endpoint is resolved through `stream_parse` and `packet_parse`, so it
/// may itself be any endpoint config those registries understand. The
/// resulting dialer and listener keep the endpoint's first hop and are
/// always tunneled.
pub fn parse_shadowsocks_transport<S, P>(
    ctx: &ParseContext,
    node: ConfigNode,
    stream_parse: S,
    packet_parse: P,
) -> Result<TransportPair>
where
    S: FnOnce(&ParseContext, ConfigNode) -> Result<Endpoint<StreamConn>>,
    P: FnOnce(&ParseContext, ConfigNode) -> Result<Endpoint<PacketConn>>,
{
    let config = parse_shadowsocks_config(&node)?;
    let params = parse_shadowsocks_params(&config)?;
    if let Some(address) = config.endpoint.as_str() {
        parse_host_port(address).at("endpoint")?;
    }

    let stream_endpoint = stream_parse(ctx, config.endpoint.clone()).at("endpoint")?;
    let packet_endpoint = packet_parse(ctx, config.endpoint).at("endpoint")?;
    debug!(
        cipher = %params.cipher,
        has_prefix = params.prefix.is_some(),
        "Resolved Shadowsocks transport via {}",
        stream_endpoint.first_hop()
    );

    Ok(TransportPair {
        stream_dialer: stream_endpoint.into_dialer(params.layer()),
        packet_listener: packet_endpoint.into_dialer(params.layer()),
    })
}
