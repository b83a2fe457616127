//! HTTP resource fetching with bounded retry.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel as channel;
use indicatif::ProgressBar;
use reqwest::blocking::Client;
use thiserror::Error;
use tracing::{debug, warn};

use crate::base_system::config::Config;

/// Status codes worth another attempt. Anything else fails fast: a 404 stays
/// a 404 no matter how often it is asked.
const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http {status} fetching {url}")]
    Status { url: String, status: u16 },
    #[error("giving up on {url} after {attempts} attempts")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        source: Box<FetchError>,
    },
    #[error("transport error fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("io error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Fetches resources relative to a base URL and persists them under a working
/// root, mirroring the relative path.
pub struct ResourceFetcher {
    client: Client,
    base_url: String,
    root: PathBuf,
    max_retries: u32,
    retry_delay: Duration,
}

impl ResourceFetcher {
    pub fn new(client: Client, base_url: String, root: PathBuf, cfg: &Config) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            root,
            max_retries: cfg.max_retries.max(1),
            retry_delay: Duration::from_secs(cfg.retry_wait_time),
        }
    }

    /// Fetch `base_url/<rel_path>` and write the body to `root/<rel_path>`.
    ///
    /// Transport errors and retryable HTTP statuses are retried up to the
    /// configured attempt budget with a fixed delay in between; any other
    /// status aborts immediately. The destination file is only created on
    /// success, so a failed fetch leaves nothing behind.
    pub fn fetch(&self, rel_path: &str) -> Result<(), FetchError> {
        let url = format!("{}/{}", self.base_url, rel_path.trim_start_matches('/'));
        let mut last_err = None;

        for attempt in 1..=self.max_retries {
            debug!(
                "fetching url: {} (attempt {}/{})",
                url, attempt, self.max_retries
            );
            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if resp.status().is_success() {
                        let bytes = match resp.bytes() {
                            Ok(b) => b,
                            Err(source) => {
                                // Body read failures are transport-class: retry.
                                warn!("failed to read body of {url}: {source}");
                                last_err = Some(FetchError::Transport {
                                    url: url.clone(),
                                    source,
                                });
                                self.pause_before_retry(attempt);
                                continue;
                            }
                        };
                        self.write_resource(rel_path, &bytes)?;
                        debug!("fetched and saved: {} -> {}", url, rel_path);
                        return Ok(());
                    }

                    if !RETRY_STATUSES.contains(&status) {
                        return Err(FetchError::Status {
                            url: url.clone(),
                            status,
                        });
                    }
                    warn!(
                        "http {} fetching {}, attempt {}/{}",
                        status, url, attempt, self.max_retries
                    );
                    last_err = Some(FetchError::Status {
                        url: url.clone(),
                        status,
                    });
                    self.pause_before_retry(attempt);
                }
                Err(source) => {
                    warn!(
                        "transport error fetching {}, attempt {}/{}: {}",
                        url, attempt, self.max_retries, source
                    );
                    last_err = Some(FetchError::Transport {
                        url: url.clone(),
                        source,
                    });
                    self.pause_before_retry(attempt);
                }
            }
        }

        warn!(
            "giving up on {} after {} attempts",
            url, self.max_retries
        );
        // last_err is always set here: the loop only falls through after a
        // retryable failure recorded it.
        Err(FetchError::RetriesExhausted {
            url,
            attempts: self.max_retries,
            source: Box::new(last_err.expect("retry loop recorded an error")),
        })
    }

    fn pause_before_retry(&self, attempt: u32) {
        if attempt < self.max_retries && !self.retry_delay.is_zero() {
            thread::sleep(self.retry_delay);
        }
    }

    fn write_resource(&self, rel_path: &str, bytes: &[u8]) -> Result<(), FetchError> {
        let dest = self.root.join(rel_path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|source| FetchError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&dest, bytes).map_err(|source| FetchError::Io { path: dest, source })
    }

    /// Fetch every path across a bounded worker pool.
    ///
    /// Individual fetch ordering carries no meaning; the only guarantee is
    /// that all paths completed successfully when this returns `Ok`. The
    /// first error wins and cancels the remaining queue.
    pub fn fetch_all(
        &self,
        rel_paths: &[String],
        workers: usize,
        bar: Option<&ProgressBar>,
    ) -> Result<(), FetchError> {
        let workers = workers.clamp(1, 16).min(rel_paths.len().max(1));
        let (tx, rx) = channel::unbounded::<String>();
        for path in rel_paths {
            let _ = tx.send(path.clone());
        }
        drop(tx);

        let failed: Mutex<Option<FetchError>> = Mutex::new(None);
        let cancel = AtomicBool::new(false);
        let failed = &failed;
        let cancel = &cancel;

        thread::scope(|s| {
            for _ in 0..workers {
                let rx = rx.clone();
                s.spawn(move || {
                    while let Ok(rel_path) = rx.recv() {
                        if cancel.load(Ordering::Relaxed) {
                            continue;
                        }
                        match self.fetch(&rel_path) {
                            Ok(()) => {
                                if let Some(bar) = bar {
                                    bar.inc(1);
                                }
                            }
                            Err(err) => {
                                cancel.store(true, Ordering::Relaxed);
                                let mut slot = failed.lock().unwrap();
                                if slot.is_none() {
                                    *slot = Some(err);
                                }
                            }
                        }
                    }
                });
            }
        });

        match failed.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{serve_routes, serve_script};

    fn test_config() -> Config {
        Config {
            max_retries: 3,
            retry_wait_time: 0, // keep retry tests fast
            ..Config::default()
        }
    }

    fn fetcher_for(base_url: &str, root: &std::path::Path) -> ResourceFetcher {
        ResourceFetcher::new(
            Client::new(),
            base_url.to_string(),
            root.to_path_buf(),
            &test_config(),
        )
    }

    #[test]
    fn succeeds_on_third_attempt_after_two_server_errors() {
        let server = serve_script(vec![
            (500, Vec::new()),
            (500, Vec::new()),
            (200, b"third time lucky".to_vec()),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher_for(&server.base_url, dir.path());

        fetcher.fetch("book/chapter1.xhtml").unwrap();

        assert_eq!(server.hits(), 3);
        let body = fs::read_to_string(dir.path().join("book/chapter1.xhtml")).unwrap();
        assert_eq!(body, "third time lucky");
    }

    #[test]
    fn not_found_fails_fast_without_creating_file() {
        // 404 is not in the retry set, so exactly one attempt is made.
        let server = serve_script(vec![(404, Vec::new())]);
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher_for(&server.base_url, dir.path());

        let err = fetcher.fetch("missing.xhtml").unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert_eq!(server.hits(), 1);
        assert!(!dir.path().join("missing.xhtml").exists());
    }

    #[test]
    fn unavailable_fails_after_full_retry_budget() {
        let server = serve_script(vec![(503, Vec::new())]);
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher_for(&server.base_url, dir.path());

        let err = fetcher.fetch("busy.xhtml").unwrap_err();
        match err {
            FetchError::RetriesExhausted {
                attempts, source, ..
            } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, FetchError::Status { status: 503, .. }));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
        assert_eq!(server.hits(), 3);
        assert!(!dir.path().join("busy.xhtml").exists());
    }

    #[test]
    fn fetch_all_writes_every_resource() {
        let server = serve_routes([
            ("/a.xhtml".to_string(), b"aaa".to_vec()),
            ("/img/b.png".to_string(), b"bbb".to_vec()),
            ("/css/c.css".to_string(), b"ccc".to_vec()),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher_for(&server.base_url, dir.path());

        let paths = vec![
            "a.xhtml".to_string(),
            "img/b.png".to_string(),
            "css/c.css".to_string(),
        ];
        fetcher.fetch_all(&paths, 3, None).unwrap();

        assert_eq!(fs::read(dir.path().join("a.xhtml")).unwrap(), b"aaa");
        assert_eq!(fs::read(dir.path().join("img/b.png")).unwrap(), b"bbb");
        assert_eq!(fs::read(dir.path().join("css/c.css")).unwrap(), b"ccc");
    }

    #[test]
    fn fetch_all_reports_first_failure() {
        let server = serve_routes([("/a.xhtml".to_string(), b"aaa".to_vec())]);
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher_for(&server.base_url, dir.path());

        let paths = vec!["a.xhtml".to_string(), "gone.xhtml".to_string()];
        let err = fetcher.fetch_all(&paths, 2, None).unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }
}
