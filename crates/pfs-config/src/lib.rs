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

//! Live runtime parameters shared by the settings filesystem and the cache,
//! read-ahead and transport subsystems.
//!
//! Layout: `model.rs` (`FsSettings` + `SettingsSnapshot`), `validate.rs`
//! (parsing and range rules), `loader.rs` (environment overrides),
//! `defaults.rs` (limits and default values).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use defaults::{CACHE_PAGES_FLOOR, MAX_CACHE_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE};
pub use error::{ConfigError, ConfigResult};
pub use model::{FsSettings, SettingsSnapshot};
pub use validate::{parse_flag, parse_unsigned};
