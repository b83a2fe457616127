//! Book URL resolution.
//!
//! Turns an arbitrary input URL (hosting-site book page, reader page, or direct
//! asset URL) into the base URL under which the unpacked EPUB's files live,
//! plus the book name used for the output file.

pub mod epub_pub;
pub mod readanybook;

use reqwest::blocking::Client;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("no 'Read Online' link found on page {url}")]
    MissingReadLink { url: String },
    #[error("no asset URL found in reader page {url}")]
    MissingAssetUrl { url: String },
    #[error("no EPUB source link found on page {url}")]
    MissingSourceLink { url: String },
    #[error("no book archive segment (*.epub) in url {url}")]
    NoArchiveSegment { url: String },
}

/// Where the book's files live, and what to call the finished file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBook {
    pub base_url: String,
    pub book_name: String,
}

/// The recognized hosting-site URL shapes. The set is small and fixed, so a
/// plain enum with per-shape resolution functions is all the dispatch needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostShape {
    /// www.epub.pub book page with a "Read Online" button.
    EpubPubLanding,
    /// spread/continuous reader page embedding the asset URL.
    EpubPubSpread,
    /// asset.epub.pub URL already pointing at (or under) the unpacked EPUB.
    EpubPubAsset,
    /// readanybook.com book page with a download link row.
    ReadAnyBook,
    /// Anything else: the input URL is taken as the base URL itself.
    Direct,
}

impl HostShape {
    pub fn for_url(url: &str) -> Self {
        match host_of(url) {
            "www.epub.pub" | "epub.pub" => Self::EpubPubLanding,
            "spread.epub.pub" | "continuous.epub.pub" => Self::EpubPubSpread,
            "asset.epub.pub" => Self::EpubPubAsset,
            "www.readanybook.com" | "readanybook.com" => Self::ReadAnyBook,
            _ => Self::Direct,
        }
    }
}

/// Resolve the input URL into the EPUB base URL and book name.
///
/// Issues at most two page fetches (landing shape); the direct and fallback
/// shapes make no network calls at all.
pub fn resolve(client: &Client, url: &str) -> Result<ResolvedBook, LocatorError> {
    let shape = HostShape::for_url(url);
    debug!("using {:?} shape for url: {}", shape, url);
    match shape {
        HostShape::EpubPubLanding => epub_pub::resolve_landing(client, url),
        HostShape::EpubPubSpread => epub_pub::resolve_spread(client, url),
        HostShape::EpubPubAsset => base_from_asset_url(url),
        HostShape::ReadAnyBook => readanybook::resolve(client, url),
        HostShape::Direct => Ok(resolve_direct(url)),
    }
}

/// Truncate an asset URL at the first path segment ending in `.epub`.
///
/// Hosting sites keep one book-archive segment per path, so the first match is
/// the right one even when the suffix appears again deeper in the path.
pub(crate) fn base_from_asset_url(url: &str) -> Result<ResolvedBook, LocatorError> {
    let mut parts: Vec<&str> = Vec::new();
    for part in url.split('/') {
        parts.push(part);
        if part.ends_with(".epub") {
            let book_name = part.split('.').next().unwrap_or(part);
            return Ok(ResolvedBook {
                base_url: parts.join("/"),
                book_name: book_name.to_string(),
            });
        }
    }
    Err(LocatorError::NoArchiveSegment {
        url: url.to_string(),
    })
}

fn resolve_direct(url: &str) -> ResolvedBook {
    let last = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url);
    let book_name = last.split('.').next().unwrap_or(last);
    ResolvedBook {
        base_url: url.to_string(),
        book_name: book_name.to_string(),
    }
}

fn host_of(url: &str) -> &str {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    rest.split(['/', '?', '#']).next().unwrap_or("")
}

pub(crate) fn fetch_page(client: &Client, url: &str) -> Result<String, LocatorError> {
    let wrap = |source: reqwest::Error| LocatorError::Http {
        url: url.to_string(),
        source,
    };
    client
        .get(url)
        .send()
        .map_err(wrap)?
        .error_for_status()
        .map_err(wrap)?
        .text()
        .map_err(wrap)
}
