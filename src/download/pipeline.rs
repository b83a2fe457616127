//! Pipeline orchestration.
//!
//! Linear sequence: resolve → working tree → container descriptor → package
//! manifest → fetch all resources → archive → cleanup. The working tree lives
//! in a `TempDir`, so it is removed on every exit path: explicitly on success,
//! and by `Drop` when any step fails.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tracing::{info, warn};

use crate::base_system::config::Config;
use crate::base_system::safe_fs_name;
use crate::download::fetcher::{FetchError, ResourceFetcher};
use crate::epub::archive::{self, ArchiveError};
use crate::epub::manifest::{self, ManifestError};
use crate::epub::{CONTAINER_PATH, MIMETYPE};
use crate::locator::{self, LocatorError};
use crate::network;

/// Package document path assumed when the origin exposes no container
/// descriptor and one has to be synthesized.
const DEFAULT_OPF_PATH: &str = "content.opf";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Resolve(#[from] LocatorError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Run the full pipeline for one book URL; returns the path of the finished
/// `.epub`. No partial output is ever left behind: the archive is only built
/// once every manifest resource has been fetched, and it is moved to the
/// output path atomically.
pub fn run(cfg: &Config, book_url: &str) -> Result<PathBuf, PipelineError> {
    let client = network::build_client(cfg)?;

    info!("resolving book location for {book_url}");
    let book = locator::resolve(&client, book_url)?;
    info!("determined EPUB base url: {}", book.base_url);

    let save_dir = Path::new(&cfg.save_path);
    fs::create_dir_all(save_dir)?;

    let book_name = safe_fs_name(&book.book_name, '_', 128);
    let working = tempfile::Builder::new()
        .prefix(&format!("{book_name}_"))
        .tempdir_in(save_dir)?;

    fs::write(working.path().join("mimetype"), MIMETYPE)?;

    let fetcher = ResourceFetcher::new(
        client,
        book.base_url.clone(),
        working.path().to_path_buf(),
        cfg,
    );

    info!("downloading container descriptor");
    if let Err(err) = fetcher.fetch(CONTAINER_PATH) {
        warn!("no container descriptor at origin ({err}); synthesizing one for {DEFAULT_OPF_PATH}");
        let container = working.path().join(CONTAINER_PATH);
        if let Some(parent) = container.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&container, manifest::synthesize_container(DEFAULT_OPF_PATH))?;
    }

    let opf_rel = manifest::read_container(&working.path().join(CONTAINER_PATH))?;

    info!("downloading package document {opf_rel}");
    fetcher.fetch(&opf_rel)?;

    let entries = manifest::read_package_manifest(working.path(), &opf_rel)?;
    info!("fetching {} resources", entries.len());

    let bar = ProgressBar::new(entries.len() as u64);
    if let Ok(style) =
        ProgressStyle::with_template("{prefix} [{elapsed_precise}] {wide_bar} {pos}/{len} ({eta})")
    {
        bar.set_style(style.progress_chars("##-"));
    }
    bar.set_prefix("Fetching files");

    let paths: Vec<String> = entries.into_iter().collect();
    let fetched = fetcher.fetch_all(&paths, cfg.max_workers, Some(&bar));
    bar.finish_and_clear();
    fetched?;

    let out_path = save_dir.join(format!("{book_name}.epub"));
    info!("creating EPUB at: {}", out_path.display());
    archive::build(working.path(), &out_path)?;

    working.close()?;
    Ok(out_path)
}
