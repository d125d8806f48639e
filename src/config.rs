//! JSON input file loading.
//!
//! Three inputs drive a run: the source-link list, the company watchlist,
//! and the optional per-recipient column widths. All of them load with the
//! same forgiving semantics: a missing or unparsable file is treated as its
//! empty default (with a warning), never as a fatal error. A run with no
//! sources simply does nothing.

use crate::models::ColumnWidths;
use itertools::Itertools;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use tokio::fs;
use tracing::{info, warn};

/// Read a JSON file into `T`, falling back to `default` when the file is
/// missing or unparsable.
async fn load_json_or_default<T: DeserializeOwned>(path: &str, default: T) -> T {
    match fs::read_to_string(path).await {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(path, error = %e, "Input file is unparsable; using default");
                default
            }
        },
        Err(e) => {
            warn!(path, error = %e, "Input file unreadable; using default");
            default
        }
    }
}

/// Load the ordered source-link list.
///
/// Duplicate URLs are collapsed to their first occurrence: one scrape per
/// source, and the configured order stays meaningful for the digest.
pub async fn load_sources(path: &str) -> Vec<String> {
    let sources: Vec<String> = load_json_or_default(path, Vec::new()).await;
    let sources: Vec<String> = sources.into_iter().unique().collect();
    info!(path, count = sources.len(), "Loaded source links");
    sources
}

/// Load the watchlist of favored companies, trimmed for exact matching
/// against postings' trimmed company names.
pub async fn load_watchlist(path: &str) -> HashSet<String> {
    let companies: Vec<String> = load_json_or_default(path, Vec::new()).await;
    let watchlist: HashSet<String> = companies
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    info!(path, count = watchlist.len(), "Loaded watchlist");
    watchlist
}

/// Load per-recipient digest column widths.
///
/// Recipients absent from the map render with [`ColumnWidths::default`].
pub async fn load_recipient_widths(path: &str) -> HashMap<String, ColumnWidths> {
    let widths: HashMap<String, ColumnWidths> = load_json_or_default(path, HashMap::new()).await;
    info!(path, count = widths.len(), "Loaded recipient widths");
    widths
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(contents: &str) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.json");
        std::fs::write(&path, contents).unwrap();
        let path = path.to_str().unwrap().to_string();
        (dir, path)
    }

    #[tokio::test]
    async fn test_load_sources_preserves_order_and_dedupes() {
        let (_dir, path) = write_temp(r#"["https://a.example.com", "https://b.example.com", "https://a.example.com"]"#);
        let sources = load_sources(&path).await;
        assert_eq!(sources, vec!["https://a.example.com", "https://b.example.com"]);
    }

    #[tokio::test]
    async fn test_load_sources_missing_file_is_empty() {
        let sources = load_sources("/nonexistent/links.json").await;
        assert!(sources.is_empty());
    }

    #[tokio::test]
    async fn test_load_sources_garbage_is_empty() {
        let (_dir, path) = write_temp("][ nope");
        let sources = load_sources(&path).await;
        assert!(sources.is_empty());
    }

    #[tokio::test]
    async fn test_load_watchlist_trims_entries() {
        let (_dir, path) = write_temp(r#"["  Acme ", "Globex", "  "]"#);
        let watchlist = load_watchlist(&path).await;
        assert!(watchlist.contains("Acme"));
        assert!(watchlist.contains("Globex"));
        assert_eq!(watchlist.len(), 2);
    }

    #[tokio::test]
    async fn test_load_recipient_widths() {
        let (_dir, path) = write_temp(
            r#"{"wide@example.com": {"title": 85, "company": 35, "date": 10, "location": 20, "tags": 55}}"#,
        );
        let widths = load_recipient_widths(&path).await;
        assert_eq!(widths["wide@example.com"].title, 85);
        assert!(!widths.contains_key("other@example.com"));
    }
}
