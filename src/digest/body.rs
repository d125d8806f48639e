//! Full digest body and subject-line assembly.
//!
//! The body is built in two passes over the aggregate results:
//!
//! 1. **Watchlist pass**: every posting whose trimmed company is on the
//!    watchlist renders into one section at the top, regardless of which
//!    source it came from, and its apply link is marked consumed.
//! 2. **Source pass**: the remaining postings render per source, in the
//!    configured source order (aggregate-only sources trail in arbitrary
//!    order). Within a source, target-region postings (location mentioning
//!    "CA" or "California") come first. Each non-empty group gets a header
//!    with the cleaned category label and the group's posting count.
//!
//! A 40-dash separator renders once, before the first source group, and only
//! when a watchlist section precedes it.

use crate::digest::line::{Highlight, render_line};
use crate::models::{ColumnWidths, SourceListing};
use crate::utils::sanitize_category;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::fmt::Write;

/// Location substrings that pull a posting into the target-region group.
const REGION_MARKERS: [&str; 2] = ["CA", "California"];

fn in_region(location: &str) -> bool {
    REGION_MARKERS.iter().any(|marker| location.contains(marker))
}

/// Total postings currently aggregated, across every source.
///
/// This is the number the subject line reports.
pub fn total_postings(aggregate: &HashMap<String, SourceListing>) -> usize {
    aggregate.values().map(|listing| listing.postings.len()).sum()
}

/// The digest subject line for a run that found `total` postings.
pub fn subject_line(total: usize, date: NaiveDate) -> String {
    format!(
        "Intern Bot 🤖 : {} internships found on {}",
        total,
        date.format("%m/%d/%Y")
    )
}

/// Wrap a composed body in the monospace block the digest renders in.
pub fn wrap_html(body: &str) -> String {
    format!("<pre style=\"font-family: monospace;\">{body}</pre>")
}

/// Compose one recipient's digest body.
///
/// `configured` defines the preferred source order; aggregate entries not in
/// it are appended afterwards so nothing scraped is silently dropped.
pub fn compose_body(
    widths: &ColumnWidths,
    aggregate: &HashMap<String, SourceListing>,
    configured: &[String],
    watchlist: &HashSet<String>,
) -> String {
    let order: Vec<&String> = configured
        .iter()
        .chain(aggregate.keys().filter(|url| !configured.contains(*url)))
        .collect();

    // Watchlist pass.
    let mut watch_entries: Vec<String> = Vec::new();
    let mut consumed: HashSet<&str> = HashSet::new();
    for source in &order {
        let Some(listing) = aggregate.get(*source) else {
            continue;
        };
        for posting in &listing.postings {
            if watchlist.contains(posting.company.trim()) {
                watch_entries.push(render_line(posting, widths, Highlight::Watchlist));
                consumed.insert(posting.apply_link.as_str());
            }
        }
    }

    let mut body = String::new();
    if !watch_entries.is_empty() {
        write!(body, "===== ⭐ Watchlist ({}) =====\n\n", watch_entries.len()).unwrap();
        for entry in &watch_entries {
            body.push_str(entry);
        }
    }

    // Source pass.
    let mut first_group = true;
    for source in &order {
        let Some(listing) = aggregate.get(*source) else {
            continue;
        };

        let mut region_entries: Vec<String> = Vec::new();
        let mut other_entries: Vec<String> = Vec::new();
        for posting in &listing.postings {
            if consumed.contains(posting.apply_link.as_str()) {
                continue;
            }
            if in_region(&posting.location) {
                region_entries.push(render_line(posting, widths, Highlight::Region));
            } else {
                other_entries.push(render_line(posting, widths, Highlight::Plain));
            }
        }

        let count = region_entries.len() + other_entries.len();
        if count == 0 {
            continue;
        }

        if !watch_entries.is_empty() && first_group {
            body.push_str("\n\n");
            body.push_str(&"-".repeat(40));
            body.push('\n');
        }
        first_group = false;

        let category = sanitize_category(&listing.category);
        write!(
            body,
            "\n===== From: <a href=\"{source}\" target=\"_blank\">{category}</a> ({count}) =====\n\n"
        )
        .unwrap();
        for entry in region_entries.iter().chain(other_entries.iter()) {
            body.push_str(entry);
        }
    }

    body
}
