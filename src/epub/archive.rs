//! Final zip assembly obeying the EPUB container rules.

use std::fs::{self, File};
use std::io;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::FileOptions;

use super::MIMETYPE;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Pack the working tree into an EPUB zip at `out`.
///
/// The `mimetype` entry comes first, stored without compression, with the
/// literal EPUB media type; every other file is added deflated under its
/// forward-slash path relative to the tree root. A `mimetype` file in the
/// tree is skipped during the walk so the entry is never duplicated. The zip
/// is written to a temporary sibling and moved into place only once complete,
/// so a failed build never leaves a half-written archive at `out`.
pub fn build(root: &Path, out: &Path) -> Result<(), ArchiveError> {
    let out_dir = out.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = match out_dir {
        Some(dir) => NamedTempFile::new_in(dir)?,
        None => NamedTempFile::new()?,
    };

    {
        let mut zip = ZipWriter::new(tmp.as_file_mut());

        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file("mimetype", stored)?;
        zip.write_all(MIMETYPE.as_bytes())?;

        // Sorted walk keeps the entry order deterministic across rebuilds.
        let mut entries = Vec::new();
        collect_files(root, root, &mut entries)?;
        entries.sort();

        let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for rel in entries {
            if rel == "mimetype" {
                continue;
            }
            debug!("adding {rel} to archive");
            zip.start_file(rel.clone(), deflated)?;
            let mut file = File::open(root.join(&rel))?;
            io::copy(&mut file, &mut zip)?;
        }

        zip.finish()?;
    }

    tmp.persist(out).map_err(|e| ArchiveError::Io(e.error))?;
    Ok(())
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<(), ArchiveError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_files(root, &path, out)?;
        } else {
            out.push(relative_name(root, &path));
        }
    }
    Ok(())
}

fn relative_name(root: &Path, path: &Path) -> String {
    let rel: PathBuf = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
