//! URL shorthand configs
//!
//! Transport configs can be written as compact URLs:
//! - `ss://BASE64(cipher:secret)@host:port/?prefix=...#label`
//! - `ss://cipher:secret@host:port?prefix=...`
//! - `ss://BASE64(cipher:secret@host:port?prefix=...)#label`
//!
//! [`normalize_url`] turns any of these into the same map node a structured
//! document would produce, so named-field parsers handle both.

use std::collections::BTreeMap;

use tracing::trace;

use super::base64::decode_base64_text;
use crate::config::{ConfigNode, TYPE_KEY};
use crate::error::{ConfigError, Result};

/// Removes one pair of surrounding double quotes (copy-pasted links).
pub fn strip_quotes(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(trimmed)
}

/// Extracts the scheme of a URL-shaped string.
///
/// Returns `None` when the text has no `://` separator (for example a plain
/// `host:port`), and a format error when the separator is there but the
/// scheme is empty or malformed.
pub fn extract_scheme(text: &str) -> Result<Option<&str>> {
    let text = strip_quotes(text);
    let Some(pos) = text.find("://") else {
        return Ok(None);
    };
    let scheme = &text[..pos];

    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid {
        return Err(ConfigError::format(format!("invalid URL scheme: {scheme:?}")));
    }
    Ok(Some(scheme))
}

// ============================================================================
// URL Config
// ============================================================================

/// The parts of a shorthand URL, with the fully-encoded form already unwrapped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlConfig {
    pub scheme: String,
    /// Raw user-info, still encoded
    pub userinfo: Option<String>,
    pub host_port: String,
    /// Percent-decoded query parameters, in order
    pub query: Vec<(String, String)>,
    /// Percent-decoded fragment; a display label only
    pub fragment: Option<String>,
}

impl UrlConfig {
    pub fn parse(text: &str) -> Result<Self> {
        let text = strip_quotes(text);
        let scheme = extract_scheme(text)?
            .ok_or_else(|| ConfigError::format("missing URL scheme"))?
            .to_string();
        let rest = &text[scheme.len() + "://".len()..];

        let (main, fragment) = match rest.split_once('#') {
            Some((main, raw)) => (main, Some(decode_percent(raw)?)),
            None => (rest, None),
        };

        // Without user-info the whole authority may be one base64 token
        // holding the real URL body.
        if !main.contains('@')
            && let Some(inner) = decode_encoded_body(main)
        {
            trace!("Unwrapped fully encoded {} URL", scheme);
            let mut config = Self::parse_body(scheme, &inner)?;
            config.fragment = fragment;
            return Ok(config);
        }

        let mut config = Self::parse_body(scheme, main)?;
        config.fragment = fragment;
        Ok(config)
    }

    fn parse_body(scheme: String, body: &str) -> Result<Self> {
        let (authority_path, raw_query) = match body.split_once('?') {
            Some((before, query)) => (before, Some(query)),
            None => (body, None),
        };

        let (userinfo, host_path) = match authority_path.rsplit_once('@') {
            Some((userinfo, host)) => (Some(userinfo.to_string()), host),
            None => (None, authority_path),
        };

        let (host_port, path) = match host_path.split_once('/') {
            Some((host, path)) => (host, path),
            None => (host_path, ""),
        };
        if !path.is_empty() {
            return Err(ConfigError::format(format!("unexpected URL path: /{path}")));
        }
        if host_port.is_empty() {
            return Err(ConfigError::format("URL is missing host:port"));
        }

        let query = raw_query
            .map(|q| {
                ::url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            scheme,
            userinfo,
            host_port: host_port.to_string(),
            query,
            fragment: None,
        })
    }

    /// Decodes user-info into its `(user, password)` pair.
    ///
    /// Percent-escapes are decoded first (base64 padding is often written as
    /// `%3D`). The result is then tried as base64 (URL-safe, then standard),
    /// and only when it is not base64 of a `user:password` pair is it taken
    /// literally.
    pub fn credentials(&self) -> Result<Option<(String, String)>> {
        let Some(userinfo) = self.userinfo.as_deref() else {
            return Ok(None);
        };
        let unescaped = decode_percent(userinfo)?;

        if let Ok(decoded) = decode_base64_text(&unescaped)
            && let Some((user, password)) = decoded.split_once(':')
        {
            trace!("Decoded base64 user-info");
            return Ok(Some((user.to_string(), password.to_string())));
        }

        let (user, password) = unescaped.split_once(':').ok_or_else(|| {
            ConfigError::format("user-info is neither base64 nor user:password")
        })?;
        Ok(Some((user.to_string(), password.to_string())))
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Display label carried in the fragment
    pub fn label(&self) -> Option<&str> {
        self.fragment.as_deref()
    }
}

/// Query parameters carried into the normalized node
const QUERY_FIELDS: &[&str] = &["prefix"];

/// Query parameters that change how the link must be dialed; ignoring them
/// would produce a transport that cannot reach the server.
const REJECTED_QUERY_FIELDS: &[&str] = &["plugin"];

/// Normalizes a shorthand URL into a config map node.
///
/// The result holds `$type` (the scheme), `endpoint`, `cipher` and `secret`
/// (from user-info) and `prefix` when the query has one. Other query
/// parameters (such as Outline's `outline=1` marker) are ignored, except
/// `plugin`, which is a schema error. The fragment is a label and does not
/// become a field.
pub fn normalize_url(text: &str) -> Result<ConfigNode> {
    let url = UrlConfig::parse(text)?;

    let mut map = BTreeMap::new();
    map.insert(TYPE_KEY.to_string(), ConfigNode::from(url.scheme.as_str()));
    map.insert("endpoint".to_string(), ConfigNode::from(url.host_port.as_str()));
    if let Some((cipher, secret)) = url.credentials()? {
        map.insert("cipher".to_string(), ConfigNode::from(cipher));
        map.insert("secret".to_string(), ConfigNode::from(secret));
    }

    for (key, value) in url.query {
        if REJECTED_QUERY_FIELDS.contains(&key.as_str()) {
            return Err(ConfigError::schema(key, "not supported in URL configs"));
        }
        if !QUERY_FIELDS.contains(&key.as_str()) {
            trace!("Ignoring URL query parameter '{}'", key);
            continue;
        }
        if map.contains_key(&key) {
            return Err(ConfigError::format(format!("query parameter '{key}' is repeated")));
        }
        map.insert(key, ConfigNode::from(value));
    }

    Ok(ConfigNode::Map(map))
}

fn decode_percent(raw: &str) -> Result<String> {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ConfigError::format(format!("invalid percent-encoding in {raw:?}")))
}

/// Returns the decoded URL body if `token` is base64 of `...@host:port...`.
fn decode_encoded_body(token: &str) -> Option<String> {
    // A trailing '/' is either an empty path or the last standard-alphabet
    // symbol, so try the token both ways.
    [token, token.trim_end_matches('/')]
        .into_iter()
        .filter(|candidate| !candidate.is_empty())
        .find_map(|candidate| decode_base64_text(candidate).ok())
        .filter(|decoded| decoded.contains('@'))
}
