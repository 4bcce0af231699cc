//! Direct endpoint parser
//!
//! Accepts either a bare `host:port` string or `{ $type: dial, address: host:port }`
//! and produces a direct [`Endpoint`] whose first hop is that address.

use tracing::trace;

use super::parse_host_port;
use crate::config::{ConfigNode, FieldReader};
use crate::error::{ConfigError, Result, ResultExt};
use crate::parser::ParseContext;
use crate::transport::{ConnKind, Endpoint};

pub const DIAL_TYPE: &str = "dial";

pub fn parse_dial_endpoint<C: ConnKind>(ctx: &ParseContext, node: ConfigNode) -> Result<Endpoint<C>> {
    ctx.check()?;
    let address = match &node {
        ConfigNode::String(address) => address.as_str(),
        ConfigNode::Map(_) => FieldReader::new(&node, &["address"])?.required_str("address")?,
        other => {
            return Err(ConfigError::format(format!(
                "endpoint must be a host:port string or a map, got {}",
                other.kind_name()
            )));
        }
    };

    parse_host_port(address).at("address")?;
    trace!("Resolved direct {} endpoint to {}", C::NAME, address);
    Ok(Endpoint::direct(address))
}
