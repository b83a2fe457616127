//! epub.pub URL shapes: landing page, spread/continuous reader, direct asset.

use std::sync::OnceLock;

use regex::Regex;
use reqwest::blocking::Client;
use tracing::debug;

use super::{LocatorError, ResolvedBook, base_from_asset_url, fetch_page};

static RE_READ_LINK: OnceLock<Regex> = OnceLock::new();
static RE_DATA_DOMAIN: OnceLock<Regex> = OnceLock::new();
static RE_DATA_READID: OnceLock<Regex> = OnceLock::new();
static RE_ASSET_INPUT: OnceLock<Regex> = OnceLock::new();
static RE_VALUE: OnceLock<Regex> = OnceLock::new();
static RE_OPF_URL: OnceLock<Regex> = OnceLock::new();

fn re_read_link() -> &'static Regex {
    RE_READ_LINK.get_or_init(|| {
        Regex::new(r#"(?i)<a[^>]*class=["'][^"']*btn-read[^"']*["'][^>]*>"#)
            .expect("compile RE_READ_LINK")
    })
}

fn re_data_domain() -> &'static Regex {
    RE_DATA_DOMAIN.get_or_init(|| {
        Regex::new(r#"(?i)data-domain\s*=\s*["']([^"']+)["']"#).expect("compile RE_DATA_DOMAIN")
    })
}

fn re_data_readid() -> &'static Regex {
    RE_DATA_READID.get_or_init(|| {
        Regex::new(r#"(?i)data-readid\s*=\s*["']([^"']+)["']"#).expect("compile RE_DATA_READID")
    })
}

fn re_asset_input() -> &'static Regex {
    RE_ASSET_INPUT.get_or_init(|| {
        Regex::new(r#"(?i)<input[^>]*id=["']assetUrl["'][^>]*>"#).expect("compile RE_ASSET_INPUT")
    })
}

fn re_value() -> &'static Regex {
    RE_VALUE
        .get_or_init(|| Regex::new(r#"(?i)value\s*=\s*["']([^"']+)["']"#).expect("compile RE_VALUE"))
}

fn re_opf_url() -> &'static Regex {
    RE_OPF_URL
        .get_or_init(|| Regex::new(r#"https?://[^\s"'<>]+\.opf"#).expect("compile RE_OPF_URL"))
}

/// Landing shape: find the "Read Online" button, compose the reader URL from
/// its `data-domain`/`data-readid` attributes, then continue as a spread page.
pub fn resolve_landing(client: &Client, url: &str) -> Result<ResolvedBook, LocatorError> {
    let html = fetch_page(client, url)?;
    let tag = re_read_link()
        .find(&html)
        .map(|m| m.as_str())
        .ok_or_else(|| LocatorError::MissingReadLink {
            url: url.to_string(),
        })?;

    let missing = || LocatorError::MissingReadLink {
        url: url.to_string(),
    };
    let domain = capture_one(re_data_domain(), tag).ok_or_else(missing)?;
    let read_id = capture_one(re_data_readid(), tag).ok_or_else(missing)?;

    let spread_url = format!("{}/epub/{}", domain.trim_end_matches('/'), read_id);
    debug!("fetching read online url: {spread_url}");
    resolve_spread(client, &spread_url)
}

/// Spread/continuous shape: the reader page embeds the package document URL,
/// either as a hidden `assetUrl` form field or inside inline script text.
pub fn resolve_spread(client: &Client, url: &str) -> Result<ResolvedBook, LocatorError> {
    let html = fetch_page(client, url)?;
    let asset_url = find_asset_url(&html).ok_or_else(|| LocatorError::MissingAssetUrl {
        url: url.to_string(),
    })?;
    debug!("found asset url: {asset_url}");
    base_from_asset_url(&asset_url)
}

fn find_asset_url(html: &str) -> Option<String> {
    if let Some(tag) = re_asset_input().find(html)
        && let Some(value) = capture_one(re_value(), tag.as_str())
    {
        return Some(value);
    }
    // Some reader variants only carry the URL in inline script text.
    re_opf_url().find(html).map(|m| m.as_str().to_string())
}

fn capture_one(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}
