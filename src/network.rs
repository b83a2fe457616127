//! Shared blocking HTTP client construction.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, CONNECTION, HeaderMap, HeaderValue, USER_AGENT};

use crate::base_system::config::Config;

pub fn build_client(cfg: &Config) -> reqwest::Result<Client> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    // Built without a gzip decoder; request identity so bodies are directly usable.
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    default_headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    default_headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&cfg.user_agent).unwrap_or(HeaderValue::from_static("Mozilla/5.0")),
    );

    Client::builder()
        .default_headers(default_headers)
        .timeout(Duration::from_secs(cfg.request_timeout.max(1)))
        .build()
}
