//! Config source loading
//!
//! A config source given on the command line is one of:
//! - an `http://` or `https://` URL, fetched over HTTP
//! - inline config text (an `ss://` link, a JSON object, a YAML document)
//! - a file path, with `~` expanded to the home directory

use anyhow::{Context, Result};
use tracing::debug;

use crate::get_version;

// ============================================================================
// Path Utilities
// ============================================================================

/// Expand ~ to home directory in path
pub fn expand_tilde(path: &str) -> String {
    if (path.starts_with("~/") || path == "~")
        && let Some(home) = dirs_home()
    {
        return path.replacen('~', &home, 1);
    }
    path.to_string()
}

/// Get home directory path
pub fn dirs_home() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok()
    }
}

// ============================================================================
// Source Loading
// ============================================================================

/// Where a config source argument points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Remote,
    Inline,
    File,
}

impl SourceKind {
    pub fn detect(source: &str) -> Self {
        let trimmed = source.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            SourceKind::Remote
        } else if trimmed.contains("://")
            || trimmed.contains('\n')
            || trimmed.starts_with('{')
            || trimmed.starts_with('"')
            || trimmed.starts_with("$type")
        {
            SourceKind::Inline
        } else {
            SourceKind::File
        }
    }
}

/// Returns the config text a source argument refers to.
pub async fn load_source(source: &str) -> Result<String> {
    match SourceKind::detect(source) {
        SourceKind::Remote => fetch_text(source.trim()).await,
        SourceKind::Inline => {
            debug!("Using inline config");
            Ok(source.to_string())
        }
        SourceKind::File => read_file(source).await,
    }
}

async fn read_file(path: &str) -> Result<String> {
    let expanded = expand_tilde(path);
    debug!("Reading config file: {}", expanded);
    tokio::fs::read_to_string(&expanded)
        .await
        .with_context(|| format!("Failed to read config file: {}", expanded))
}

/// Fetch text content from a URL
pub async fn fetch_text(url: &str) -> Result<String> {
    debug!("Fetching URL: {}", url);

    let client = reqwest::Client::builder()
        .user_agent(format!("switchyard/{}", get_version()))
        .build()
        .context("Failed to build HTTP client")?;

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch URL: {}", url))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("HTTP request failed with status {}: {}", status, url);
    }

    response
        .text()
        .await
        .with_context(|| format!("Failed to read response body from: {}", url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde("/absolute/path");
        assert_eq!(expanded, "/absolute/path");

        let expanded = expand_tilde("relative/path");
        assert_eq!(expanded, "relative/path");

        if let Some(home) = dirs_home() {
            assert_eq!(expand_tilde("~/switchyard.yaml"), format!("{home}/switchyard.yaml"));
        }
    }

    #[test]
    fn test_detect_source_kind() {
        assert_eq!(SourceKind::detect("https://example.com/ss.yaml"), SourceKind::Remote);
        assert_eq!(SourceKind::detect("ss://YWVzLTEyOC1nY206cHc@example.com:1"), SourceKind::Inline);
        assert_eq!(SourceKind::detect(r#"{"$type": "ss"}"#), SourceKind::Inline);
        assert_eq!(SourceKind::detect("$type: ss\nendpoint: a:1"), SourceKind::Inline);
        assert_eq!(SourceKind::detect("~/transport.yaml"), SourceKind::File);
        assert_eq!(SourceKind::detect("./transport.yaml"), SourceKind::File);
    }

    #[tokio::test]
    async fn test_load_inline_and_file() {
        let inline = "ss://aes-128-gcm:pw@example.com:1234";
        assert_eq!(load_source(inline).await.unwrap(), inline);

        let path = std::env::temp_dir().join(format!("switchyard-loader-{}.yaml", std::process::id()));
        tokio::fs::write(&path, "$type: ss\n").await.unwrap();
        let text = load_source(path.to_str().unwrap()).await.unwrap();
        assert_eq!(text, "$type: ss\n");
        tokio::fs::remove_file(&path).await.unwrap();

        assert!(load_source("/nonexistent/switchyard.yaml").await.is_err());
    }
}
