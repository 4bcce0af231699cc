//! Base64 decoding for URL shorthand configs
//!
//! Tokens in `ss://` URLs are usually URL-safe base64 without padding, but
//! older links use the standard alphabet with padding. Both are tried, in
//! that order, and both tolerate present or missing padding.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use tracing::trace;

use crate::error::{ConfigError, Result};

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// ============================================================================
// Base64 Decoding
// ============================================================================

/// Decodes a base64 token, trying URL-safe first and standard second
///
/// Whitespace in the input is removed before decoding (tokens copied out of
/// wrapped text).
pub fn decode_base64(token: &str) -> Result<Vec<u8>> {
    let cleaned: String = token.chars().filter(|c| !c.is_whitespace()).collect();
    trace!("Attempting Base64 decode, cleaned length: {} bytes", cleaned.len());

    if let Ok(decoded) = URL_SAFE_LENIENT.decode(&cleaned) {
        trace!("Decoded using URL-safe Base64");
        return Ok(decoded);
    }

    if let Ok(decoded) = STANDARD_LENIENT.decode(&cleaned) {
        trace!("Decoded using standard Base64");
        return Ok(decoded);
    }

    Err(ConfigError::format("token is not valid base64"))
}

/// Decodes a base64 token that must hold UTF-8 text
pub fn decode_base64_text(token: &str) -> Result<String> {
    let decoded = decode_base64(token)?;
    String::from_utf8(decoded)
        .map_err(|_| ConfigError::format("decoded base64 token is not valid UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};

    #[test]
    fn test_decode_url_safe_no_padding() {
        let encoded = URL_SAFE_NO_PAD.encode("chacha20-ietf-poly1305:SECRET");
        assert!(!encoded.contains('='));
        assert_eq!(decode_base64_text(&encoded).unwrap(), "chacha20-ietf-poly1305:SECRET");
    }

    #[test]
    fn test_decode_standard_with_padding() {
        let encoded = STANDARD.encode("chacha20-ietf-poly1305:SECRET");
        assert!(encoded.ends_with('='));
        assert_eq!(decode_base64_text(&encoded).unwrap(), "chacha20-ietf-poly1305:SECRET");
    }

    #[test]
    fn test_decode_alphabet_specific_characters() {
        // 0xfb 0xff encodes to "-_8" (URL-safe) and "+/8" (standard)
        assert_eq!(decode_base64("-_8").unwrap(), vec![0xfb, 0xff]);
        assert_eq!(decode_base64("+/8=").unwrap(), vec![0xfb, 0xff]);
        assert_eq!(decode_base64("+/8").unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn test_decode_with_whitespace() {
        let encoded = "aGVs\nbG8g\td29ybGQ=  ";
        assert_eq!(decode_base64_text(encoded).unwrap(), "hello world");
    }

    #[test]
    fn test_decode_invalid() {
        assert!(decode_base64("not valid base64!!!").is_err());
        assert!(decode_base64("chacha20-ietf-poly1305:SECRET").is_err());
        // a single trailing symbol can never be valid
        assert!(decode_base64("abcde").is_err());
    }

    #[test]
    fn test_decode_text_rejects_invalid_utf8() {
        let encoded = URL_SAFE_NO_PAD.encode([0xff, 0xfe, 0x3a]);
        assert!(decode_base64(&encoded).is_ok());
        assert!(decode_base64_text(&encoded).is_err());
    }
}
