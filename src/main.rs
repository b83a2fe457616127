//! epub-downloader — fetch an ebook hosted as an unpacked EPUB and repack it.
//!
//! Code structure (reading entry points):
//! - `base_system`: config / logging / filesystem helpers
//! - `locator`: resolve an arbitrary book URL into the base URL of the unpacked EPUB
//! - `download`: HTTP fetching with retry, and the pipeline orchestration
//! - `epub`: container/manifest parsing and final zip assembly

use anyhow::Result;
use clap::Parser;
use tracing::info;

mod base_system;
mod download;
mod epub;
mod locator;
mod network;
#[cfg(test)]
mod testutil;

use base_system::config::{self, Config};
use base_system::logging::{LogOptions, LogSystem};

#[derive(Debug, Parser)]
#[command(name = "epub-downloader")]
#[command(about = "Download an ebook hosted as an unpacked EPUB and create a single .epub file")]
struct Cli {
    /// URL of the book page, or of the unpacked EPUB root directly
    book_url: String,

    /// Enable debug log output
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Output directory for the finished .epub (overrides save_path from config.yml)
    #[arg(short, long)]
    output: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log = LogSystem::init(LogOptions {
        debug: cli.verbose,
        ..LogOptions::default()
    })?;

    let mut cfg: Config = config::load_or_create(None)?;
    if let Some(output) = cli.output {
        cfg.save_path = output;
    }

    let epub_path = download::pipeline::run(&cfg, &cli.book_url)?;
    info!("EPUB file created: {}", epub_path.display());
    Ok(())
}
