//! EPUB container handling: manifest parsing and final zip assembly.

pub mod archive;
pub mod manifest;

/// Fixed location of the container descriptor inside an EPUB.
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Required content of the `mimetype` entry.
pub const MIMETYPE: &str = "application/epub+zip";
