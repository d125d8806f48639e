//! Persisted store of previously emailed apply links.
//!
//! The store is the run-to-run memory of the pipeline: a JSON object mapping
//! each source URL to the apply links that have already appeared in a digest.
//! The scraper consults it to know where to stop scanning, and after every
//! run the merged store is rewritten — whether or not any email went out.
//!
//! # Bounding
//!
//! Each source's set is bounded. Entries keep their insertion order (oldest
//! first, as persisted), so once a set exceeds the bound the oldest apply
//! links are evicted first. Eviction is deterministic: what survives is
//! always the most recent `cap` identifiers.

use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;
use std::error::Error;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Mapping from source URL to the ordered set of previously emailed
/// apply links for that source.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeenStore {
    entries: IndexMap<String, IndexSet<String>>,
}

impl SeenStore {
    /// Load the store from disk.
    ///
    /// A missing or unparsable file yields an empty store (with a warning):
    /// the first run, or a corrupted file, just means every posting looks
    /// new again.
    #[instrument(level = "info", skip_all, fields(path = %path))]
    pub async fn load(path: &str) -> Self {
        match fs::read_to_string(path).await {
            Ok(raw) => match serde_json::from_str::<IndexMap<String, IndexSet<String>>>(&raw) {
                Ok(entries) => {
                    info!(sources = entries.len(), "Loaded seen store");
                    Self { entries }
                }
                Err(e) => {
                    warn!(error = %e, "Seen store is unparsable; starting empty");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(error = %e, "Seen store unreadable; starting empty");
                Self::default()
            }
        }
    }

    /// The seen apply links for one source, as a lookup set for the scraper.
    pub fn seen_for(&self, source: &str) -> HashSet<String> {
        self.entries
            .get(source)
            .map(|links| links.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Append this run's newly discovered apply links to a source's set,
    /// then evict the oldest entries while the set exceeds `cap`.
    ///
    /// Links already present keep their original position (and age). A
    /// source with no new links still gets an entry, so every configured
    /// source appears in the rewritten file.
    pub fn merge<I>(&mut self, source: &str, new_links: I, cap: usize)
    where
        I: IntoIterator<Item = String>,
    {
        let links = self.entries.entry(source.to_string()).or_default();
        for link in new_links {
            links.insert(link);
        }
        while links.len() > cap {
            links.shift_remove_index(0);
        }
    }

    /// Drop every source that is no longer configured.
    ///
    /// The rewritten file only carries the current source list; stale
    /// sources age out here.
    pub fn retain_sources(&mut self, sources: &[String]) {
        self.entries.retain(|source, _| sources.contains(source));
    }

    /// Write the store back to disk, pretty-printed.
    #[instrument(level = "info", skip_all, fields(path = %path))]
    pub async fn persist(&self, path: &str) -> Result<(), Box<dyn Error>> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(path, json).await?;
        info!(sources = self.entries.len(), "Wrote seen store");
        Ok(())
    }

    #[cfg(test)]
    fn links_for(&self, source: &str) -> Vec<String> {
        self.entries
            .get(source)
            .map(|links| links.iter().cloned().collect())
            .unwrap_or_default()
    }
}
