//! Digest composition for the outgoing email.
//!
//! This module turns the run's aggregate scrape results into the
//! per-recipient HTML body and the subject line:
//!
//! # Submodules
//!
//! - [`line`]: renders one posting into a fixed-width, hyperlinked,
//!   optionally highlighted line
//! - [`body`]: assembles the full message body (watchlist section first,
//!   then per-source groups with region postings on top) and the subject
//!
//! # Layout
//!
//! ```text
//! ===== ⭐ Watchlist (2) =====
//!
//! <watchlist lines, highlighted yellow>
//!
//! ----------------------------------------
//!
//! ===== From: <a>Software Engineering</a> (3) =====
//!
//! <CA/California lines, highlighted green>
//! <remaining lines>
//! ```
//!
//! The body renders inside a monospace `<pre>` block, so every column is
//! padded to the recipient's configured widths.

pub mod body;
pub mod line;
