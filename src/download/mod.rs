//! Resource fetching and pipeline orchestration.
//!
//! - `fetcher`  — single-resource HTTP GET with bounded, status-filtered retry,
//!   plus a bounded worker pool for fetching many resources
//! - `pipeline` — the resolve → fetch → parse → fetch-all → archive sequence

pub mod fetcher;
pub mod pipeline;
