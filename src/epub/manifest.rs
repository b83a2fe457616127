//! Container descriptor and package manifest parsing.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed xml in {path}: {source}")]
    Xml {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },
    #[error("no rootfile with a full-path attribute in {path}")]
    MissingRootfile { path: PathBuf },
}

/// Read the container descriptor and return the package document path.
///
/// Exactly one `rootfile` reference is consulted (the first); a descriptor
/// without one, or without its `full-path` attribute, is an error.
pub fn read_container(path: &Path) -> Result<String, ManifestError> {
    let content = read_xml(path)?;
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if local_name(e.name().as_ref()) == b"rootfile" =>
            {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"full-path" {
                        let full_path = String::from_utf8_lossy(&attr.value).into_owned();
                        if !full_path.is_empty() {
                            debug!("found package document at: {full_path}");
                            return Ok(full_path);
                        }
                    }
                }
                return Err(ManifestError::MissingRootfile {
                    path: path.to_path_buf(),
                });
            }
            Ok(Event::Eof) => break,
            Err(source) => {
                return Err(ManifestError::Xml {
                    path: path.to_path_buf(),
                    source,
                });
            }
            _ => {}
        }
    }

    Err(ManifestError::MissingRootfile {
        path: path.to_path_buf(),
    })
}

/// Read the package document at `root/<opf_rel>` and return the set of
/// resource paths it declares.
///
/// Item paths are relative to the package document's own directory; when the
/// document lives in a subdirectory every path is prefixed with it, so the
/// result is directly usable as fetch targets relative to the base URL. The
/// set is deduplicated by construction.
pub fn read_package_manifest(
    root: &Path,
    opf_rel: &str,
) -> Result<BTreeSet<String>, ManifestError> {
    let path = root.join(opf_rel);
    let content = read_xml(&path)?;
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    let subdirectory = Path::new(opf_rel)
        .parent()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .filter(|p| !p.is_empty());

    let mut entries = BTreeSet::new();
    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if local_name(e.name().as_ref()) == b"item" =>
            {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"href" {
                        let href = String::from_utf8_lossy(&attr.value).into_owned();
                        if href.is_empty() {
                            continue;
                        }
                        let entry = match &subdirectory {
                            Some(dir) => format!("{dir}/{href}"),
                            None => href,
                        };
                        entries.insert(entry);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(source) => {
                return Err(ManifestError::Xml {
                    path: path.clone(),
                    source,
                });
            }
            _ => {}
        }
    }

    debug!("found {} file paths in {}", entries.len(), opf_rel);
    Ok(entries)
}

/// Build a minimal container descriptor for origins that expose none.
pub fn synthesize_container(opf_path: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
    <rootfiles>
        <rootfile full-path="{opf_path}" media-type="application/oebps-package+xml"/>
    </rootfiles>
</container>
"#
    )
}

fn read_xml(path: &Path) -> Result<String, ManifestError> {
    let raw = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    // Tolerate a UTF-8 BOM; quick-xml would choke on it before the prolog.
    Ok(raw.trim_start_matches('\u{feff}').to_string())
}

fn local_name(name: &[u8]) -> &[u8] {
    name.rsplit(|&b| b == b':').next().unwrap_or(name)
}
