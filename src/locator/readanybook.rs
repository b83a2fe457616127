//! readanybook.com book pages: the download row carries the direct EPUB link.

use std::sync::OnceLock;

use regex::Regex;
use reqwest::blocking::Client;
use tracing::debug;

use super::{LocatorError, ResolvedBook, fetch_page};

static RE_LINKS_ROW: OnceLock<Regex> = OnceLock::new();
static RE_DATA_LINK: OnceLock<Regex> = OnceLock::new();

fn re_links_row() -> &'static Regex {
    RE_LINKS_ROW.get_or_init(|| {
        Regex::new(r#"(?i)<div[^>]*class=["'][^"']*links-row[^"']*["'][^>]*>"#)
            .expect("compile RE_LINKS_ROW")
    })
}

fn re_data_link() -> &'static Regex {
    RE_DATA_LINK.get_or_init(|| {
        Regex::new(r#"(?i)data-link\s*=\s*["']([^"']+)["']"#).expect("compile RE_DATA_LINK")
    })
}

pub fn resolve(client: &Client, url: &str) -> Result<ResolvedBook, LocatorError> {
    let html = fetch_page(client, url)?;

    let missing = || LocatorError::MissingSourceLink {
        url: url.to_string(),
    };
    let tag = re_links_row().find(&html).map(|m| m.as_str()).ok_or_else(missing)?;
    let link = re_data_link()
        .captures(tag)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
        .ok_or_else(missing)?;

    let base_url = link.trim_end_matches('/').to_string();
    debug!("extracted EPUB url: {base_url}");

    let last = base_url.rsplit('/').next().unwrap_or(&base_url);
    let book_name = last.split('.').next().unwrap_or(last).to_string();

    Ok(ResolvedBook {
        base_url,
        book_name,
    })
}
