//! Fixed-width rendering of one posting.

use crate::models::{ColumnWidths, Posting};
use crate::utils::pad_cell;

/// Column delimiter: two spaces, a pipe, two spaces.
pub const DELIM: &str = "  |  ";
/// Trailing gap after the last column, where no delimiter follows.
pub const GAP: &str = "  ";

/// Highlight applied to a rendered line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    /// Company is on the watchlist (yellow).
    Watchlist,
    /// Location is in the target region (green).
    Region,
    /// No highlight.
    Plain,
}

/// Render one posting as a digest line.
///
/// The title renders as a hyperlink to the apply link; its visible text is
/// the title cut to the title column and trimmed, with padding after the
/// closing tag so the following columns still line up. Remaining columns are
/// padded/truncated to the recipient's widths and joined with [`DELIM`].
pub fn render_line(posting: &Posting, widths: &ColumnWidths, highlight: Highlight) -> String {
    let visible_title = pad_cell(&posting.title, widths.title).trim().to_string();
    let title_pad = widths.title - visible_title.chars().count();

    let mut line = format!(
        "<a href=\"{}\" target=\"_blank\">{}</a>",
        posting.apply_link, visible_title
    );
    line.push_str(&" ".repeat(title_pad));
    line.push_str(DELIM);
    line.push_str(&pad_cell(&posting.company, widths.company));
    line.push_str(DELIM);
    line.push_str(&pad_cell(&posting.date, widths.date));
    line.push_str(DELIM);
    line.push_str(&pad_cell(&posting.location, widths.location));
    line.push_str(DELIM);
    line.push_str(&pad_cell(&posting.tags.join(", "), widths.tags));
    line.push_str(GAP);

    let line = match highlight {
        Highlight::Watchlist => {
            format!("<span style=\"background-color: #fff8b3;\">{line}</span>")
        }
        Highlight::Region => {
            format!("<span style=\"background-color: #c8f7c5;\">{line}</span>")
        }
        Highlight::Plain => line,
    };

    line + "\n"
}
