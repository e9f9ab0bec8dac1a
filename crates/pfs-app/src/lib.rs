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

//! `pfsd` application wiring.
//!
//! Layout: `bootstrap.rs` (CLI and service wiring), `console.rs` (line-oriented
//! admin console over the registry), `error.rs`.

/// CLI parsing and service bootstrap.
pub mod bootstrap;
/// Admin console commands.
pub mod console;
/// Application error type.
pub mod error;

pub use bootstrap::{Cli, run_app};
pub use error::{AppError, AppResult};
