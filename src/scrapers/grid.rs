//! Embedded listing-grid scraper.
//!
//! Each source page hosts a third-party grid widget inside an embed box.
//! Scraping a source means resolving that embed, then walking the grid's
//! rows newest-first until a previously seen posting (or the safety cap)
//! stops the scan.
//!
//! # Grid structure
//!
//! The widget assigns its columns fresh positional indices on every render,
//! so column positions are resolved per run by matching the header cells'
//! visible labels. Rows are split across two panes sharing a `data-rowid`:
//! the left pane carries the position title, the right pane everything else.
//! The grid serves a window of rows per request; further windows are fetched
//! with an `offset` query parameter until a window yields nothing fresh.

use crate::fetch::{FetchPage, NAV_BASE_DELAY, NAV_MAX_RETRIES, Navigate, RetryNav};
use crate::models::{Posting, SourceListing};
use crate::utils::truncate_for_log;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::time::Instant;
use tracing::{debug, info, instrument};
use url::Url;

/// Company-size brackets a posting must declare to make the digest.
pub const SIZE_ALLOW_LIST: [&str; 3] = ["1001-5000", "5001-10000", "10000+"];

const COL_TITLE: &str = "Position Title";
const COL_COMPANY: &str = "Company";
const COL_DATE: &str = "Date";
const COL_LOCATION: &str = "Location";
const COL_TAGS: &str = "Company Industry";
const COL_SIZE: &str = "Company Size";

static CATEGORY_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("h2.active").unwrap());
static GRID_BOX_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("#airtable-box").unwrap());
static HEADER_CELL_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.headerRow div[data-columnindex]").unwrap());
static DATA_ROW_SEL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.dataRow.rightPane.rowExpansionEnabled.rowSelectionEnabled").unwrap()
});
static ANY_ROW_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("div.dataRow[data-rowid]").unwrap());
static CELL_TEXT_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("div.truncate").unwrap());
static CELL_MULTI_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.flex-auto.truncate-pre").unwrap());
static APPLY_SPAN_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.truncate.noevents").unwrap());

/// Scrape one source URL against its seen set.
///
/// Navigation (listing page, embed resolution, first grid window, column
/// resolution) is retried with bounded backoff; once row scanning starts,
/// any failure aborts the source. Returns only postings that are new,
/// size-allowed, and within the safety cap, newest first.
#[instrument(level = "info", skip_all, fields(source = %source_url))]
pub async fn scrape_source<F: FetchPage>(
    fetcher: &F,
    source_url: &str,
    seen: &HashSet<String>,
    max_new: usize,
) -> Result<SourceListing, Box<dyn Error>> {
    let t0 = Instant::now();

    let navigator = GridNavigator {
        fetcher,
        source_url,
    };
    let (nav, attempts) = RetryNav::new(navigator, NAV_MAX_RETRIES, NAV_BASE_DELAY)
        .run()
        .await?;

    let mut scan = RowScan::new(seen, max_new);
    let mut doc = nav.first_page;
    let mut offset = 0usize;

    loop {
        let fresh = scan.absorb_page(&doc, &nav.columns)?;
        if scan.done || fresh == 0 {
            break;
        }
        offset += fresh;
        let window = window_url(&nav.grid_url, offset);
        debug!(%window, offset, "Fetching next grid window");
        let body = fetcher.fetch(window.as_str()).await?;
        doc = Html::parse_document(&body);
    }

    info!(
        category = %nav.category,
        postings = scan.accepted.len(),
        attempts,
        elapsed_ms = t0.elapsed().as_millis() as u128,
        "Scraped source"
    );

    Ok(SourceListing {
        category: nav.category,
        postings: scan.accepted,
    })
}

/// Navigated state for one source: everything needed to start scanning rows.
struct NavigatedGrid {
    category: String,
    grid_url: Url,
    first_page: Html,
    columns: ColumnMap,
}

/// One navigation attempt: listing page -> embed URL -> first grid window.
struct GridNavigator<'a, F: FetchPage> {
    fetcher: &'a F,
    source_url: &'a str,
}

impl<F: FetchPage> Navigate for GridNavigator<'_, F> {
    type Output = NavigatedGrid;

    async fn attempt(&self) -> Result<NavigatedGrid, Box<dyn Error>> {
        let listing = self.fetcher.fetch(self.source_url).await?;
        let (category, grid_url) = parse_listing(&listing, self.source_url)?;
        let body = self.fetcher.fetch(grid_url.as_str()).await?;
        let first_page = Html::parse_document(&body);
        // A grid window that renders without its headers is as unusable as a
        // page that never loaded, so this still counts as navigation.
        let columns = resolve_columns(&first_page)?;
        Ok(NavigatedGrid {
            category,
            grid_url,
            first_page,
            columns,
        })
    }
}

/// Extract the category label and the embedded grid URL from a listing page.
fn parse_listing(html: &str, source_url: &str) -> Result<(String, Url), Box<dyn Error>> {
    let doc = Html::parse_document(html);

    let category = doc
        .select(&CATEGORY_SEL)
        .next()
        .ok_or("listing page has no h2.active heading")?
        .text()
        .collect::<String>()
        .trim()
        .to_string();

    let grid_src = doc
        .select(&GRID_BOX_SEL)
        .next()
        .ok_or("listing page has no #airtable-box embed")?
        .value()
        .attr("src")
        .ok_or("grid embed box has no src attribute")?;

    let base = Url::parse(source_url)?;
    let grid_url = base.join(grid_src)?;
    Ok((category, grid_url))
}

/// The grid URL for the window of rows starting at `offset`.
fn window_url(grid_url: &Url, offset: usize) -> Url {
    let mut url = grid_url.clone();
    url.query_pairs_mut()
        .append_pair("offset", &offset.to_string());
    url
}

/// Column indices resolved from the grid's header labels for this run.
#[derive(Debug, Clone)]
struct ColumnMap {
    title: String,
    company: String,
    date: String,
    location: String,
    tags: String,
    size: String,
}

/// Resolve the dynamic column index for every field the digest needs.
///
/// The widget reassigns `data-columnindex` values across runs, so the only
/// stable handle on a column is its header's visible label.
fn resolve_columns(doc: &Html) -> Result<ColumnMap, Box<dyn Error>> {
    let mut by_label: HashMap<String, String> = HashMap::new();
    for cell in doc.select(&HEADER_CELL_SEL) {
        let label = cell.text().collect::<String>().trim().to_string();
        if let Some(index) = cell.value().attr("data-columnindex") {
            by_label.entry(label).or_insert_with(|| index.to_string());
        }
    }

    let lookup = |label: &str| -> Result<String, Box<dyn Error>> {
        by_label
            .get(label)
            .cloned()
            .ok_or_else(|| format!("grid header \"{label}\" not found").into())
    };

    Ok(ColumnMap {
        title: lookup(COL_TITLE)?,
        company: lookup(COL_COMPANY)?,
        date: lookup(COL_DATE)?,
        location: lookup(COL_LOCATION)?,
        tags: lookup(COL_TAGS)?,
        size: lookup(COL_SIZE)?,
    })
}

/// Incremental scan state across grid windows.
///
/// Synchronous and page-driven: the async loop feeds it parsed windows and
/// it reports how many unvisited rows each one contributed, so tests can
/// drive it with fixture documents directly.
struct RowScan<'a> {
    seen: &'a HashSet<String>,
    cap: usize,
    accepted: Vec<Posting>,
    visited_rowids: HashSet<String>,
    done: bool,
}

impl<'a> RowScan<'a> {
    fn new(seen: &'a HashSet<String>, cap: usize) -> Self {
        Self {
            seen,
            cap,
            accepted: Vec::new(),
            visited_rowids: HashSet::new(),
            done: false,
        }
    }

    /// Walk one window's rows in document order.
    ///
    /// Rows already visited in an earlier (overlapping) window are skipped.
    /// Returns the number of fresh rows, which is also how far the next
    /// window's offset advances. Sets `done` when a seen posting or the
    /// safety cap ends the scan.
    fn absorb_page(&mut self, doc: &Html, columns: &ColumnMap) -> Result<usize, Box<dyn Error>> {
        let title_rows = first_rows_by_id(doc);
        let mut fresh = 0usize;

        for row in doc.select(&DATA_ROW_SEL) {
            let row_id = row
                .value()
                .attr("data-rowid")
                .ok_or("data row has no data-rowid")?
                .to_string();
            if !self.visited_rowids.insert(row_id.clone()) {
                continue;
            }
            fresh += 1;

            let (posting, size) = extract_posting(&title_rows, row, &row_id, columns)?;

            // Stop scanning entirely at the first already-seen posting (rows
            // are newest-first) or once the cap is reached.
            if self.seen.contains(&posting.apply_link) || self.accepted.len() == self.cap {
                self.done = true;
                return Ok(fresh);
            }

            match size {
                Some(ref bracket) if SIZE_ALLOW_LIST.contains(&bracket.as_str()) => {
                    self.accepted.push(posting);
                }
                _ => {
                    debug!(%row_id, ?size, "Skipping posting outside size allow-list");
                }
            }
        }

        Ok(fresh)
    }
}

/// Map each `data-rowid` to its first row element in the document.
///
/// The left-pane row (which carries the title cell) precedes its right-pane
/// twin, so the first occurrence is the one the title is read from.
fn first_rows_by_id(doc: &Html) -> HashMap<String, ElementRef<'_>> {
    let mut map = HashMap::new();
    for el in doc.select(&ANY_ROW_SEL) {
        if let Some(id) = el.value().attr("data-rowid") {
            map.entry(id.to_string()).or_insert(el);
        }
    }
    map
}

/// Build a [`Posting`] from one right-pane row, plus its company-size bracket.
fn extract_posting(
    title_rows: &HashMap<String, ElementRef<'_>>,
    row: ElementRef<'_>,
    row_id: &str,
    columns: &ColumnMap,
) -> Result<(Posting, Option<String>), Box<dyn Error>> {
    let title_row = title_rows
        .get(row_id)
        .copied()
        .ok_or_else(|| format!("no title row for data-rowid {row_id}"))?;
    let title = single_cell(title_row, &columns.title, &CELL_TEXT_SEL)?
        .ok_or_else(|| format!("empty {COL_TITLE} cell in row {row_id}"))?;

    let company = single_cell(row, &columns.company, &CELL_TEXT_SEL)?
        .ok_or_else(|| format!("empty {COL_COMPANY} cell in row {row_id}"))?;
    let date = single_cell(row, &columns.date, &CELL_TEXT_SEL)?
        .ok_or_else(|| format!("empty {COL_DATE} cell in row {row_id}"))?;
    let mut location = single_cell(row, &columns.location, &CELL_TEXT_SEL)?
        .ok_or_else(|| format!("empty {COL_LOCATION} cell in row {row_id}"))?;
    let mut tags = cell_texts(row, &columns.tags, &CELL_MULTI_SEL)?;
    let size = single_cell(row, &columns.size, &CELL_MULTI_SEL)?;
    let apply_link = apply_link(row, row_id)?;

    if location.contains("Multi Location") {
        location = "Multi Location".to_string();
    }
    if tags.is_empty() {
        tags = vec!["None".to_string()];
    }

    Ok((
        Posting {
            title,
            company,
            date,
            location,
            tags,
            apply_link,
        },
        size,
    ))
}

/// All inner text values for one cell of a row.
///
/// The cell container must exist (its absence means the row markup changed
/// under us, which aborts the source); an empty container is just an empty
/// cell.
fn cell_texts(
    row: ElementRef<'_>,
    col_index: &str,
    inner: &Selector,
) -> Result<Vec<String>, Box<dyn Error>> {
    let container_sel = column_selector(col_index)?;
    let container = row.select(&container_sel).next().ok_or_else(|| {
        format!(
            "row cell for column index {col_index} not found in {}",
            truncate_for_log(&row.html(), 120)
        )
    })?;
    Ok(container
        .select(inner)
        .map(|div| div.text().collect::<String>().trim().to_string())
        .collect())
}

/// The first inner text value for one cell, or `None` when the cell is empty.
fn single_cell(
    row: ElementRef<'_>,
    col_index: &str,
    inner: &Selector,
) -> Result<Option<String>, Box<dyn Error>> {
    Ok(cell_texts(row, col_index, inner)?.into_iter().next())
}

/// The application URL: the `href` of the anchor wrapping the row's
/// `span.truncate.noevents`.
fn apply_link(row: ElementRef<'_>, row_id: &str) -> Result<String, Box<dyn Error>> {
    let span = row
        .select(&APPLY_SPAN_SEL)
        .next()
        .ok_or_else(|| format!("no apply-link span in row {row_id}"))?;
    let anchor = span
        .parent()
        .and_then(ElementRef::wrap)
        .ok_or_else(|| format!("apply-link span in row {row_id} has no parent element"))?;
    let href = anchor
        .value()
        .attr("href")
        .ok_or_else(|| format!("apply-link anchor in row {row_id} has no href"))?;
    Ok(href.to_string())
}

/// Selector for a row's cell container at a resolved column index.
fn column_selector(col_index: &str) -> Result<Selector, Box<dyn Error>> {
    let css = format!("div[data-columnindex=\"{col_index}\"]");
    Selector::parse(&css).map_err(|e| format!("invalid column selector {css}: {e}").into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(index: u32, label: &str) -> String {
        format!(r#"<div data-columnindex="{index}"><div class="header-label">{label}</div></div>"#)
    }

    fn grid_header() -> String {
        // Deliberately shuffled indices: resolution must go by label.
        format!(
            r#"<div class="headerRow">{}{}{}{}{}{}</div>"#,
            header(7, "Position Title"),
            header(2, "Company"),
            header(9, "Date"),
            header(4, "Location"),
            header(11, "Company Industry"),
            header(5, "Company Size"),
        )
    }

    struct RowFixture<'a> {
        row_id: &'a str,
        title: &'a str,
        company: &'a str,
        date: &'a str,
        location: &'a str,
        tags: &'a [&'a str],
        size: &'a str,
        apply_link: &'a str,
    }

    fn grid_row(f: &RowFixture) -> String {
        let tags: String = f
            .tags
            .iter()
            .map(|t| format!(r#"<div class="flex-auto truncate-pre">{t}</div>"#))
            .collect();
        format!(
            concat!(
                r#"<div class="dataRow leftPane" data-rowid="{id}">"#,
                r#"<div data-columnindex="7"><div class="truncate">{title}</div></div>"#,
                r#"</div>"#,
                r#"<div class="dataRow rightPane rowExpansionEnabled rowSelectionEnabled" data-rowid="{id}">"#,
                r#"<div data-columnindex="2"><div class="truncate">{company}</div></div>"#,
                r#"<div data-columnindex="9"><div class="truncate">{date}</div></div>"#,
                r#"<div data-columnindex="4"><div class="truncate">{location}</div></div>"#,
                r#"<div data-columnindex="11">{tags}</div>"#,
                r#"<div data-columnindex="5"><div class="flex-auto truncate-pre">{size}</div></div>"#,
                r#"<a href="{apply}"><span class="truncate noevents">{title}</span></a>"#,
                r#"</div>"#,
            ),
            id = f.row_id,
            title = f.title,
            company = f.company,
            date = f.date,
            location = f.location,
            tags = tags,
            size = f.size,
            apply = f.apply_link,
        )
    }

    fn page(rows: &[RowFixture]) -> Html {
        let body: String = rows.iter().map(grid_row).collect();
        Html::parse_document(&format!("<html><body>{}{}</body></html>", grid_header(), body))
    }

    fn simple_row<'a>(row_id: &'a str, apply_link: &'a str) -> RowFixture<'a> {
        RowFixture {
            row_id,
            title: "SWE Intern",
            company: "Acme",
            date: "08/01/2026",
            location: "San Jose, CA",
            tags: &["Technology"],
            size: "10000+",
            apply_link,
        }
    }

    fn columns(doc: &Html) -> ColumnMap {
        resolve_columns(doc).unwrap()
    }

    #[test]
    fn test_resolve_columns_by_label() {
        let doc = page(&[]);
        let cols = columns(&doc);
        assert_eq!(cols.title, "7");
        assert_eq!(cols.company, "2");
        assert_eq!(cols.size, "5");
    }

    #[test]
    fn test_resolve_columns_missing_header_fails() {
        let doc = Html::parse_document(&format!(
            r#"<div class="headerRow">{}</div>"#,
            header(1, "Company")
        ));
        let err = resolve_columns(&doc).unwrap_err();
        assert!(err.to_string().contains("Position Title"));
    }

    #[test]
    fn test_extracts_posting_fields() {
        let doc = page(&[simple_row("r1", "https://apply.example.com/1")]);
        let cols = columns(&doc);
        let seen = HashSet::new();
        let mut scan = RowScan::new(&seen, 75);

        let fresh = scan.absorb_page(&doc, &cols).unwrap();
        assert_eq!(fresh, 1);
        assert_eq!(scan.accepted.len(), 1);

        let posting = &scan.accepted[0];
        assert_eq!(posting.title, "SWE Intern");
        assert_eq!(posting.company, "Acme");
        assert_eq!(posting.date, "08/01/2026");
        assert_eq!(posting.location, "San Jose, CA");
        assert_eq!(posting.tags, vec!["Technology"]);
        assert_eq!(posting.apply_link, "https://apply.example.com/1");
    }

    #[test]
    fn test_multi_location_collapses() {
        let mut row = simple_row("r1", "https://apply.example.com/1");
        row.location = "Remote; Multi Location; NY";
        let doc = page(&[row]);
        let cols = columns(&doc);
        let seen = HashSet::new();
        let mut scan = RowScan::new(&seen, 75);

        scan.absorb_page(&doc, &cols).unwrap();
        assert_eq!(scan.accepted[0].location, "Multi Location");
    }

    #[test]
    fn test_empty_tags_become_none_sentinel() {
        let mut row = simple_row("r1", "https://apply.example.com/1");
        row.tags = &[];
        let doc = page(&[row]);
        let cols = columns(&doc);
        let seen = HashSet::new();
        let mut scan = RowScan::new(&seen, 75);

        scan.absorb_page(&doc, &cols).unwrap();
        assert_eq!(scan.accepted[0].tags, vec!["None"]);
    }

    #[test]
    fn test_size_outside_allow_list_is_skipped_without_stopping() {
        let mut small = simple_row("r1", "https://apply.example.com/1");
        small.size = "11-50";
        let big = simple_row("r2", "https://apply.example.com/2");
        let doc = page(&[small, big]);
        let cols = columns(&doc);
        let seen = HashSet::new();
        let mut scan = RowScan::new(&seen, 75);

        let fresh = scan.absorb_page(&doc, &cols).unwrap();
        assert_eq!(fresh, 2);
        assert!(!scan.done);
        assert_eq!(scan.accepted.len(), 1);
        assert_eq!(scan.accepted[0].apply_link, "https://apply.example.com/2");
    }

    #[test]
    fn test_stops_at_first_seen_posting() {
        let doc = page(&[
            simple_row("r1", "https://apply.example.com/new"),
            simple_row("r2", "https://apply.example.com/old"),
            simple_row("r3", "https://apply.example.com/older"),
        ]);
        let cols = columns(&doc);
        let seen: HashSet<String> = ["https://apply.example.com/old".to_string()].into();
        let mut scan = RowScan::new(&seen, 75);

        scan.absorb_page(&doc, &cols).unwrap();
        assert!(scan.done);
        assert_eq!(scan.accepted.len(), 1);
        assert_eq!(scan.accepted[0].apply_link, "https://apply.example.com/new");
    }

    #[test]
    fn test_newest_row_already_seen_returns_nothing() {
        let doc = page(&[simple_row("r1", "https://apply.example.com/newest")]);
        let cols = columns(&doc);
        let seen: HashSet<String> = ["https://apply.example.com/newest".to_string()].into();
        let mut scan = RowScan::new(&seen, 75);

        scan.absorb_page(&doc, &cols).unwrap();
        assert!(scan.done);
        assert!(scan.accepted.is_empty());
    }

    #[test]
    fn test_safety_cap_stops_the_scan() {
        let rows = vec![
            simple_row("r1", "https://apply.example.com/1"),
            simple_row("r2", "https://apply.example.com/2"),
            simple_row("r3", "https://apply.example.com/3"),
        ];
        let doc = page(&rows);
        let cols = columns(&doc);
        let seen = HashSet::new();
        let mut scan = RowScan::new(&seen, 2);

        scan.absorb_page(&doc, &cols).unwrap();
        assert!(scan.done);
        assert_eq!(scan.accepted.len(), 2);
    }

    #[test]
    fn test_overlapping_windows_do_not_duplicate() {
        let doc1 = page(&[
            simple_row("r1", "https://apply.example.com/1"),
            simple_row("r2", "https://apply.example.com/2"),
        ]);
        // Second window re-renders r2 before the new r3.
        let doc2 = page(&[
            simple_row("r2", "https://apply.example.com/2"),
            simple_row("r3", "https://apply.example.com/3"),
        ]);
        let cols = columns(&doc1);
        let seen = HashSet::new();
        let mut scan = RowScan::new(&seen, 75);

        assert_eq!(scan.absorb_page(&doc1, &cols).unwrap(), 2);
        assert_eq!(scan.absorb_page(&doc2, &cols).unwrap(), 1);
        assert_eq!(scan.accepted.len(), 3);
    }

    #[test]
    fn test_window_url_appends_offset() {
        let grid = Url::parse("https://grid.example.com/embed/abc?view=xyz").unwrap();
        let window = window_url(&grid, 40);
        assert_eq!(
            window.as_str(),
            "https://grid.example.com/embed/abc?view=xyz&offset=40"
        );
    }

    #[test]
    fn test_parse_listing_resolves_relative_embed() {
        let html = concat!(
            r#"<html><body><h2 class="active"> Software Engineering </h2>"#,
            r#"<iframe id="airtable-box" src="/embed/abc?view=xyz"></iframe>"#,
            r#"</body></html>"#,
        );
        let (category, grid_url) = parse_listing(html, "https://lists.example.com/swe").unwrap();
        assert_eq!(category, "Software Engineering");
        assert_eq!(grid_url.as_str(), "https://lists.example.com/embed/abc?view=xyz");
    }

    #[test]
    fn test_parse_listing_without_embed_fails() {
        let html = r#"<html><body><h2 class="active">SWE</h2></body></html>"#;
        let err = parse_listing(html, "https://lists.example.com/swe").unwrap_err();
        assert!(err.to_string().contains("airtable-box"));
    }
}
