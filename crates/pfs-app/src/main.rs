#![forbid(unsafe_code)]
#![deny(
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Binary entrypoint that wires the settings registry, logging and admin
//! console together.

use pfs_app::{AppResult, run_app};

/// Bootstraps `pfsd` and blocks until the console closes.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app().await
}
