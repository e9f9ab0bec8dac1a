//! Synthetic file attributes for the settings directory and its files.
//!
//! # Design
//! - Built once when the registry is constructed: scalar settings are sized by
//!   running their getter into a scratch buffer, the event stream follows the
//!   queue's head gauge.
//! - A successful write resizes the file and bumps its modification time; the
//!   directory record never changes after construction.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use pfs_events::HeadSizeGauge;
use serde::Serialize;

use crate::descriptor::{SettingsContext, descriptors};

/// Preferred I/O block size reported for every synthetic file.
pub const FS_BLOCK_SIZE: u32 = 4096;
/// Scratch buffer used to measure a setting's rendered length.
pub(crate) const SCRATCH_LEN: usize = 4096;

const STAT_BLOCK_UNIT: u64 = 512;
const MODE_REGULAR: u32 = 0o100_000 | 0o644;
const MODE_DIRECTORY: u32 = 0o040_000 | 0o755;

/// File type of a synthetic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// The settings root.
    Directory,
    /// A setting file.
    Regular,
}

/// Owner recorded on every synthetic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OwnerIdentity {
    /// Owning user id.
    pub uid: u32,
    /// Owning group id.
    pub gid: u32,
}

impl OwnerIdentity {
    /// Effective identity of the running process.
    #[cfg(unix)]
    #[must_use]
    pub fn current() -> Self {
        Self {
            uid: nix::unistd::geteuid().as_raw(),
            gid: nix::unistd::getegid().as_raw(),
        }
    }

    /// Effective identity of the running process (always root off unix).
    #[cfg(not(unix))]
    #[must_use]
    pub const fn current() -> Self {
        Self { uid: 0, gid: 0 }
    }
}

/// `stat`-style attributes of a synthetic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileAttr {
    /// Entry type.
    pub kind: FileKind,
    /// Type and permission bits, `st_mode` layout.
    pub mode: u32,
    /// Hard link count.
    pub nlink: u32,
    /// Size in bytes.
    pub size: u64,
    /// Allocated 512-byte blocks; only reported on unix.
    pub blocks: Option<u64>,
    /// Preferred I/O block size; only reported on unix.
    pub block_size: Option<u32>,
    /// Owning user id.
    pub uid: u32,
    /// Owning group id.
    pub gid: u32,
    /// Creation (status change) time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub modified_at: DateTime<Utc>,
}

impl FileAttr {
    fn new(
        kind: FileKind,
        mode: u32,
        nlink: u32,
        size: u64,
        owner: OwnerIdentity,
        now: DateTime<Utc>,
    ) -> Self {
        let mut attr = Self {
            kind,
            mode,
            nlink,
            size: 0,
            blocks: None,
            block_size: cfg!(unix).then_some(FS_BLOCK_SIZE),
            uid: owner.uid,
            gid: owner.gid,
            created_at: now,
            modified_at: now,
        };
        attr.resize(size);
        attr
    }

    fn resize(&mut self, size: u64) {
        self.size = size;
        self.blocks = cfg!(unix).then(|| size.div_ceil(STAT_BLOCK_UNIT));
    }
}

struct MetadataSlot {
    attr: Mutex<FileAttr>,
    live_size: Option<HeadSizeGauge>,
}

/// Attribute records for the root directory and every descriptor.
pub(crate) struct MetadataStore {
    directory: FileAttr,
    slots: Vec<MetadataSlot>,
}

impl MetadataStore {
    pub(crate) fn build(
        context: &SettingsContext,
        owner: OwnerIdentity,
        now: DateTime<Utc>,
    ) -> Self {
        let mut scratch = vec![0_u8; SCRATCH_LEN];
        let slots = descriptors()
            .iter()
            .map(|descriptor| {
                let (size, live_size) = if descriptor.supports_stat() {
                    (descriptor.read(context, &mut scratch) as u64, None)
                } else {
                    let gauge = context.events.size_gauge();
                    (gauge.get(), Some(gauge))
                };
                MetadataSlot {
                    attr: Mutex::new(FileAttr::new(
                        FileKind::Regular,
                        MODE_REGULAR,
                        1,
                        size,
                        owner,
                        now,
                    )),
                    live_size,
                }
            })
            .collect::<Vec<_>>();

        let directory = FileAttr::new(
            FileKind::Directory,
            MODE_DIRECTORY,
            2,
            slots.len() as u64,
            owner,
            now,
        );
        Self { directory, slots }
    }

    pub(crate) const fn directory(&self) -> FileAttr {
        self.directory
    }

    pub(crate) fn stat(&self, index: usize) -> FileAttr {
        let slot = &self.slots[index];
        let mut attr = *slot.attr.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(gauge) = &slot.live_size {
            attr.resize(gauge.get());
        }
        attr
    }

    pub(crate) fn resync(&self, index: usize, size: u64, now: DateTime<Utc>) {
        let mut attr = self.slots[index]
            .attr
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        attr.resize(size);
        attr.modified_at = now;
    }
}
