//! Data models for scraped postings and digest formatting.
//!
//! This module defines the core data structures used throughout the
//! application:
//! - [`Posting`]: One internship posting as read out of the embedded grid
//! - [`SourceListing`]: The postings newly discovered at one source URL,
//!   together with the source's category label
//! - [`ColumnWidths`]: Per-recipient fixed column widths for the digest

use serde::{Deserialize, Serialize};

/// A single internship posting scraped from a listing grid.
///
/// Postings are immutable once scraped. They live for the duration of one
/// run: created by the scraper, consumed by the digest formatter, never
/// persisted (only the `apply_link` identifier is remembered between runs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    /// The position title shown in the grid.
    pub title: String,
    /// The hiring company.
    pub company: String,
    /// The posting date, as rendered by the grid (free-form text).
    pub date: String,
    /// The posting location. A location mentioning "Multi Location" is
    /// collapsed to exactly that string during scraping.
    pub location: String,
    /// Industry tags. An empty tag cell becomes the single sentinel `"None"`.
    pub tags: Vec<String>,
    /// The application URL. Doubles as the posting's unique identifier for
    /// dedup against the seen store.
    pub apply_link: String,
}

/// The result of scraping one source URL.
///
/// Holds only postings that were *newly* discovered this run (not present in
/// the source's seen set) and that passed the company-size allow-list,
/// ordered as the grid rendered them (newest first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceListing {
    /// Human-readable category label taken from the listing page heading.
    pub category: String,
    /// Newly discovered postings, newest first.
    pub postings: Vec<Posting>,
}

/// Fixed column widths used when rendering digest lines for one recipient.
///
/// Each field is the number of characters reserved for the corresponding
/// posting column. Values are per-recipient so readers on narrow screens can
/// get a tighter layout; recipients without an override use
/// [`ColumnWidths::default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnWidths {
    pub title: usize,
    pub company: usize,
    pub date: usize,
    pub location: usize,
    pub tags: usize,
}

impl Default for ColumnWidths {
    fn default() -> Self {
        Self {
            title: 60,
            company: 25,
            date: 10,
            location: 20,
            tags: 40,
        }
    }
}
