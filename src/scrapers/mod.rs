//! Source scrapers for the internship listing pages.
//!
//! Every configured source is the same kind of page (a listing page hosting
//! an embedded grid widget), so a single scraper handles them all:
//!
//! 1. **Navigation**: load the listing page, resolve the embedded grid
//!    document, load the first window of rows (retried with bounded backoff)
//! 2. **Scanning**: walk rows newest-first across grid windows until a
//!    previously seen posting, the safety cap, or exhaustion stops the scan
//!
//! Scrapers use:
//! - A shared HTTP client through the [`crate::fetch::FetchPage`] seam
//! - Header-label column resolution (the widget's column indices are not
//!   stable across runs)
//! - Graceful per-source error handling: a failed source is logged and left
//!   out of the run's aggregate, never aborting the other sources

pub mod grid;
