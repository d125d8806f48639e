//! Command-line interface definitions for the internship digest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Credentials and the recipient list can be provided via environment
//! variables, which is how the scheduled (cron) deployment supplies them.

use clap::Parser;

/// Command-line arguments for the internship digest run.
///
/// A run reads three JSON inputs (source links, seen postings, company
/// watchlist), scrapes every source, rewrites the seen-postings file, and
/// mails a digest when anything new turned up.
///
/// # Examples
///
/// ```sh
/// # Default file locations, credentials from the environment
/// USER_EMAIL=bot@gmail.com USER_PASSWORD=... RECIPIENTS=a@x.com,b@y.com intern_digest
///
/// # Explicit files and a smaller scrape fan-out
/// intern_digest --links-file ./links.json --seen-file ./seen_items.json --max-parallel 2
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the JSON array of source listing-page URLs
    #[arg(long, default_value = "links.json")]
    pub links_file: String,

    /// Path to the JSON map of previously emailed apply links per source
    #[arg(long, default_value = "seen_items.json")]
    pub seen_file: String,

    /// Path to the JSON array of watchlist company names
    #[arg(long, default_value = "watchlist.json")]
    pub watchlist_file: String,

    /// Path to the JSON map of per-recipient digest column widths
    #[arg(long, default_value = "recipient_widths.json")]
    pub widths_file: String,

    /// Sender email address
    #[arg(long, env = "USER_EMAIL")]
    pub sender: Option<String>,

    /// Sender SMTP credential (an app password, not the account password)
    #[arg(long, env = "USER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Comma-separated recipient addresses
    #[arg(long, env = "RECIPIENTS")]
    pub recipients: Option<String>,

    /// SMTP relay host
    #[arg(long, default_value = "smtp.gmail.com")]
    pub smtp_host: String,

    /// SMTP relay port (implicit TLS)
    #[arg(long, default_value_t = 465)]
    pub smtp_port: u16,

    /// Maximum number of sources scraped concurrently
    #[arg(long, default_value_t = 4)]
    pub max_parallel: usize,

    /// Safety cap on newly accepted postings per source
    #[arg(long, default_value_t = 75)]
    pub max_new_per_source: usize,

    /// Maximum remembered apply links per source in the seen file
    #[arg(long, default_value_t = 500)]
    pub max_seen_per_source: usize,

    /// HTTP connect/read timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub http_timeout_secs: u64,
}

impl Cli {
    /// Split the comma-separated recipient value into trimmed addresses,
    /// dropping blank entries.
    pub fn recipient_list(&self) -> Vec<String> {
        self.recipients
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect()
    }
}
