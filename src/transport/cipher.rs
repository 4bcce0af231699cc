//! Shadowsocks cipher names recognized by the transport layer.
//!
//! The cipher implementations live outside this crate; only the name set is
//! checked here, and the validated name is forwarded with the secret.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ConfigError;

/// AEAD cipher supported by the Shadowsocks layer
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cipher {
    #[serde(rename = "chacha20-ietf-poly1305")]
    Chacha20IetfPoly1305,
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
    #[serde(rename = "aes-192-gcm")]
    Aes192Gcm,
    #[serde(rename = "aes-128-gcm")]
    Aes128Gcm,
}

impl Cipher {
    pub const ALL: [Cipher; 4] = [
        Cipher::Chacha20IetfPoly1305,
        Cipher::Aes256Gcm,
        Cipher::Aes192Gcm,
        Cipher::Aes128Gcm,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Cipher::Chacha20IetfPoly1305 => "chacha20-ietf-poly1305",
            Cipher::Aes256Gcm => "aes-256-gcm",
            Cipher::Aes192Gcm => "aes-192-gcm",
            Cipher::Aes128Gcm => "aes-128-gcm",
        }
    }

    /// Looks up a cipher by its exact name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cipher| cipher.name() == name)
    }

    pub fn is_supported(name: &str) -> bool {
        Self::from_name(name).is_some()
    }
}

impl fmt::Display for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Cipher {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::from_name(name)
            .ok_or_else(|| ConfigError::validation(format!("unsupported cipher: {name}")))
    }
}
