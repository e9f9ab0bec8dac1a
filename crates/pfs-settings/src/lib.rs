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

//! Virtual settings filesystem core.
//!
//! A fixed table of named settings is exposed as synthetic files: each one can
//! be listed, `stat`ed, read and written through [`SettingsRegistry`]. Scalar
//! settings format the live parameter on read and validate on write; the
//! `events` file streams the diagnostic event queue.
//!
//! Layout: `descriptor.rs` (setting table, getters and validating setters),
//! `metadata.rs` (synthetic file attributes), `registry.rs` (public facade),
//! `invalidate.rs` (cache reset collaborator), `error.rs`.

pub mod descriptor;
pub mod error;
pub mod invalidate;
pub mod metadata;
pub mod registry;

pub use descriptor::{EVENTS_SETTING, SettingDescriptor, descriptors};
pub use error::{ErrorKind, SettingsError, SettingsResult};
pub use invalidate::{BroadcastInvalidator, CacheInvalidator, CacheReset, NoopInvalidator};
pub use metadata::{FS_BLOCK_SIZE, FileAttr, FileKind, OwnerIdentity};
pub use registry::SettingsRegistry;
