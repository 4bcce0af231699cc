//! Transport parsers module
//!
//! Concrete parsers registered in the type registries: the direct `dial`
//! endpoint and the Shadowsocks transport.

pub mod dial;
pub mod shadowsocks;

pub use dial::{DIAL_TYPE, parse_dial_endpoint};
pub use shadowsocks::{
    SHADOWSOCKS_TYPE, ShadowsocksConfig, ShadowsocksParams, parse_shadowsocks_config,
    parse_shadowsocks_params, parse_shadowsocks_transport,
};

use crate::error::{ConfigError, Result};

// ============================================================================
// Helper Functions
// ============================================================================

/// Parses host:port string, handling IPv6 addresses in brackets
pub fn parse_host_port(hostport: &str) -> Result<(String, u16)> {
    let (host, port_str) = if hostport.starts_with('[') {
        // IPv6 addresses: [::1]:8080
        let bracket_end = hostport.find(']').ok_or_else(|| {
            ConfigError::validation("invalid IPv6 address: missing closing bracket")
        })?;
        let port_str = hostport
            .get(bracket_end + 1..)
            .and_then(|rest| rest.strip_prefix(':'))
            .ok_or_else(|| ConfigError::validation("missing port after IPv6 address"))?;
        (&hostport[..=bracket_end], port_str)
    } else {
        hostport.rsplit_once(':').ok_or_else(|| {
            ConfigError::validation(format!("invalid host:port {hostport:?}: missing port"))
        })?
    };

    if host.is_empty() {
        return Err(ConfigError::validation(format!(
            "invalid host:port {hostport:?}: missing host"
        )));
    }
    let parsed = ::url::Host::parse(host).map_err(|e| {
        ConfigError::validation(format!("invalid host in {hostport:?}: {e}"))
    })?;
    let port: u16 = port_str
        .parse()
        .map_err(|_| ConfigError::validation(format!("invalid port number: {port_str:?}")))?;

    let host = match parsed {
        ::url::Host::Ipv6(addr) => addr.to_string(),
        _ => host.to_string(),
    };
    Ok((host, port))
}
