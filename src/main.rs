//! # Intern Digest
//!
//! A scraping and notification pipeline that watches internship listing
//! pages, remembers which postings it has already reported, and emails each
//! configured recipient an HTML digest of whatever is new.
//!
//! ## Features
//!
//! - Scrapes any number of listing pages hosting the embedded grid widget,
//!   concurrently, over one pooled HTTP client
//! - Stops scanning each source at the first previously seen posting (rows
//!   are newest-first), with a safety cap for first runs
//! - Filters postings to an allow-list of company-size brackets
//! - Remembers reported postings in a bounded, FIFO-evicted JSON store
//! - Renders per-recipient fixed-width digests with watchlist and
//!   target-region highlighting, delivered over authenticated SMTP
//!
//! ## Usage
//!
//! ```sh
//! USER_EMAIL=bot@gmail.com USER_PASSWORD=app-password \
//!   RECIPIENTS=reader@example.com intern_digest
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Load**: read the source links, seen store, watchlist, and widths
//! 2. **Scrape**: one worker per source, `max_parallel` at a time; each
//!    worker returns its result over the stream (no shared mutable state)
//! 3. **Merge**: after the join barrier, fold new apply links into the seen
//!    store and rewrite it
//! 4. **Notify**: if anything new was found, send one digest per recipient

use chrono::Local;
use clap::Parser;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::error::Error;
use std::time::Duration;
use tracing::{error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod digest;
mod fetch;
mod mailer;
mod models;
mod scrapers;
mod seen;
mod utils;

use cli::Cli;
use digest::body::{compose_body, subject_line, total_postings, wrap_html};
use fetch::HttpFetcher;
use mailer::Mailer;
use models::SourceListing;
use seen::SeenStore;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("intern_digest starting up");

    let args = Cli::parse();

    // ---- Load inputs ----
    let sources = config::load_sources(&args.links_file).await;
    if sources.is_empty() {
        info!(path = %args.links_file, "No source links configured; exiting");
        return Ok(());
    }

    let recipients = args.recipient_list();
    let (Some(sender), Some(password)) = (args.sender.clone(), args.password.clone()) else {
        info!("Email credentials (USER_EMAIL, USER_PASSWORD) not set; exiting");
        return Ok(());
    };
    if recipients.is_empty() {
        info!("No recipients configured (RECIPIENTS); exiting");
        return Ok(());
    }

    let mut store = SeenStore::load(&args.seen_file).await;
    let watchlist = config::load_watchlist(&args.watchlist_file).await;
    let widths_by_recipient = config::load_recipient_widths(&args.widths_file).await;

    // ---- Scrape all sources concurrently ----
    let fetcher = HttpFetcher::new(Duration::from_secs(args.http_timeout_secs))?;
    let max_parallel = args.max_parallel.max(1);
    info!(
        sources = sources.len(),
        max_parallel, "Starting source scrape"
    );

    let results: Vec<(String, Option<SourceListing>)> = stream::iter(sources.clone())
        .map(|source| {
            let fetcher = &fetcher;
            let seen = store.seen_for(&source);
            let max_new = args.max_new_per_source;
            async move {
                match scrapers::grid::scrape_source(fetcher, &source, &seen, max_new).await {
                    Ok(listing) => (source, Some(listing)),
                    Err(e) => {
                        error!(%source, error = %e, "Source scrape failed; leaving it out of this run");
                        (source, None)
                    }
                }
            }
        })
        .buffer_unordered(max_parallel)
        .collect()
        .await;

    // Every worker has returned; the aggregate is complete from here on.
    let aggregate: HashMap<String, SourceListing> = results
        .into_iter()
        .filter_map(|(source, listing)| listing.map(|l| (source, l)))
        .collect();
    info!(
        succeeded = aggregate.len(),
        failed = sources.len() - aggregate.len(),
        "Scraping complete"
    );

    // ---- Merge and persist the seen store ----
    for source in &sources {
        let new_links: Vec<String> = aggregate
            .get(source)
            .map(|listing| {
                listing
                    .postings
                    .iter()
                    .map(|p| p.apply_link.clone())
                    .collect()
            })
            .unwrap_or_default();
        store.merge(source, new_links, args.max_seen_per_source);
    }
    store.retain_sources(&sources);
    store.persist(&args.seen_file).await?;

    // ---- Send digests ----
    let total = total_postings(&aggregate);
    if total == 0 {
        info!("No new internships found; no emails sent");
    } else {
        let subject = subject_line(total, Local::now().date_naive());
        info!(
            total,
            recipients = recipients.len(),
            "Connecting to email relay"
        );
        let mailer = Mailer::connect(&args.smtp_host, args.smtp_port, &sender, &password)?;
        for recipient in &recipients {
            let widths = widths_by_recipient
                .get(recipient)
                .copied()
                .unwrap_or_default();
            let body = compose_body(&widths, &aggregate, &sources, &watchlist);
            mailer
                .send_digest(recipient, &subject, wrap_html(&body))
                .await?;
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Run complete"
    );

    Ok(())
}
