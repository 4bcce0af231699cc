pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod parser;
pub mod provider;
pub mod transport;

pub use error::{ConfigError, ErrorKind, Result};
pub use provider::TransportProvider;

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
