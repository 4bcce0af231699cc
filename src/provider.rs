//! Default transport provider
//!
//! Wires the registries a client needs to turn a transport config into a
//! stream dialer and packet listener:
//! - stream and packet endpoint registries: a bare `host:port`, `dial`, and
//!   `first-supported`
//! - the transport registry: `ss` (by `$type` and by URL scheme) and
//!   `first-supported`

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{ConfigNode, parse_config_yaml};
use crate::error::Result;
use crate::parser::protocols::{DIAL_TYPE, SHADOWSOCKS_TYPE, parse_dial_endpoint, parse_shadowsocks_transport};
use crate::parser::{FIRST_SUPPORTED_TYPE, ParseContext, TypeParser, parse_first_supported};
use crate::transport::{ConnKind, Endpoint, PacketConn, StreamConn, TransportPair};

pub type StreamEndpointParser = TypeParser<Endpoint<StreamConn>>;
pub type PacketEndpointParser = TypeParser<Endpoint<PacketConn>>;
pub type TransportParser = TypeParser<TransportPair>;

/// Resolves each option of a first-supported list against the same registry.
fn first_supported_parser<T>(ctx: &ParseContext, registry: &TypeParser<T>, node: ConfigNode) -> Result<T> {
    parse_first_supported(ctx, node, |ctx, option| registry.parse(ctx, option))
}

fn dial_parser<C: ConnKind>(
    ctx: &ParseContext,
    _registry: &TypeParser<Endpoint<C>>,
    node: ConfigNode,
) -> Result<Endpoint<C>> {
    parse_dial_endpoint(ctx, node)
}

/// Endpoint registry with the built-in endpoint kinds
pub fn default_endpoint_parser<C: ConnKind>() -> Result<TypeParser<Endpoint<C>>> {
    let mut registry = TypeParser::with_fallback(dial_parser::<C>);
    registry
        .register(DIAL_TYPE, dial_parser::<C>)?
        .register(FIRST_SUPPORTED_TYPE, first_supported_parser::<Endpoint<C>>)?;
    Ok(registry)
}

// ============================================================================
// Provider
// ============================================================================

/// Registry set for resolving transport configs
///
/// Built once, then shared; parsing takes `&self` and is safe to call from
/// many threads at once.
#[derive(Debug)]
pub struct TransportProvider {
    stream_endpoints: Arc<StreamEndpointParser>,
    packet_endpoints: Arc<PacketEndpointParser>,
    transports: TransportParser,
}

impl TransportProvider {
    /// Provider with the built-in endpoint and transport kinds
    pub fn new_default() -> Result<Self> {
        Self::with_endpoint_parsers(default_endpoint_parser()?, default_endpoint_parser()?)
    }

    /// Provider resolving nested endpoints through the given registries.
    ///
    /// The built-in transports are registered on top; more can be added with
    /// [`register_transport`](Self::register_transport).
    pub fn with_endpoint_parsers(
        stream_endpoints: StreamEndpointParser,
        packet_endpoints: PacketEndpointParser,
    ) -> Result<Self> {
        let stream_endpoints = Arc::new(stream_endpoints);
        let packet_endpoints = Arc::new(packet_endpoints);

        let mut transports = TransportParser::new();
        let stream = Arc::clone(&stream_endpoints);
        let packet = Arc::clone(&packet_endpoints);
        transports
            .register(SHADOWSOCKS_TYPE, move |ctx, _registry, node| {
                parse_shadowsocks_transport(
                    ctx,
                    node,
                    |ctx, endpoint| stream.parse(ctx, endpoint),
                    |ctx, endpoint| packet.parse(ctx, endpoint),
                )
            })?
            .register(FIRST_SUPPORTED_TYPE, first_supported_parser::<TransportPair>)?;

        debug!(
            "Transport provider ready with types {:?}",
            transports.discriminators()
        );
        Ok(Self {
            stream_endpoints,
            packet_endpoints,
            transports,
        })
    }

    /// Adds a transport kind under a new discriminator.
    pub fn register_transport<F>(&mut self, discriminator: &str, parser: F) -> Result<&mut Self>
    where
        F: Fn(&ParseContext, &TransportParser, ConfigNode) -> Result<TransportPair> + Send + Sync + 'static,
    {
        self.transports.register(discriminator, parser)?;
        Ok(self)
    }

    /// Resolves a transport config node.
    pub fn parse(&self, ctx: &ParseContext, node: ConfigNode) -> Result<TransportPair> {
        let pair = self.transports.parse(ctx, node)?;
        info!(
            "Resolved transport: first hop {} ({})",
            pair.stream_dialer.first_hop(),
            pair.stream_dialer.conn_type()
        );
        Ok(pair)
    }

    /// Parses config text (YAML, JSON or a bare URL) and resolves it.
    pub fn parse_text(&self, ctx: &ParseContext, text: &str) -> Result<TransportPair> {
        let node = parse_config_yaml(text)?;
        self.parse(ctx, node)
    }

    pub fn stream_endpoints(&self) -> &StreamEndpointParser {
        &self.stream_endpoints
    }

    pub fn packet_endpoints(&self) -> &PacketEndpointParser {
        &self.packet_endpoints
    }

    pub fn transports(&self) -> &TransportParser {
        &self.transports
    }
}
