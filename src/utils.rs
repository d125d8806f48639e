//! Utility functions for fixed-width text layout and string cleanup.
//!
//! This module provides helper functions used throughout the application:
//! - Character-based cell padding for the monospace digest columns
//! - Category-label sanitization for section headers
//! - String truncation for logging

use once_cell::sync::Lazy;
use regex::Regex;

/// Pad or truncate a string to an exact character width.
///
/// Strings shorter than `width` are right-padded with spaces; longer strings
/// are cut. Width is measured in characters, not bytes, so multibyte input
/// still lines up in a monospace rendering.
///
/// # Arguments
///
/// * `s` - The cell contents
/// * `width` - The exact number of characters to produce
///
/// # Examples
///
/// ```ignore
/// assert_eq!(pad_cell("abc", 5), "abc  ");
/// assert_eq!(pad_cell("abcdef", 4), "abcd");
/// ```
pub fn pad_cell(s: &str, width: usize) -> String {
    let mut out: String = s.chars().take(width).collect();
    let len = out.chars().count();
    if len < width {
        out.extend(std::iter::repeat(' ').take(width - len));
    }
    out
}

static CATEGORY_CLEANUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9 ]+").unwrap());

/// Strip a category label down to letters, digits, and spaces.
///
/// Listing pages decorate their headings with emoji and punctuation; the
/// digest section headers want just the words.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sanitize_category("📌 Software Engineering!"), "Software Engineering");
/// ```
pub fn sanitize_category(s: &str) -> String {
    CATEGORY_CLEANUP.replace_all(s, "").trim().to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes with an ellipsis and byte count
/// indicator appended. Used when logging snippets of scraped markup.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut cut = max;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_cell_pads_short_strings() {
        assert_eq!(pad_cell("abc", 6), "abc   ");
        assert_eq!(pad_cell("", 3), "   ");
    }

    #[test]
    fn test_pad_cell_truncates_long_strings() {
        assert_eq!(pad_cell("abcdefgh", 4), "abcd");
    }

    #[test]
    fn test_pad_cell_exact_width_unchanged() {
        assert_eq!(pad_cell("abcd", 4), "abcd");
    }

    #[test]
    fn test_pad_cell_counts_characters_not_bytes() {
        // Four characters, far more than four bytes.
        assert_eq!(pad_cell("héllo", 4), "héll");
        assert_eq!(pad_cell("⭐", 3), "⭐  ");
    }

    #[test]
    fn test_sanitize_category() {
        assert_eq!(sanitize_category("Software Engineering"), "Software Engineering");
        assert_eq!(sanitize_category("📌 Tech & Data!"), "Tech  Data");
        assert_eq!(sanitize_category("  Quant (2026)  "), "Quant 2026");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }
}
