//! Filesystem abstraction used by the record store.
//!
//! The store never touches `std::fs` directly. It talks to a [`Filesystem`]
//! trait object, which is implemented by:
//!
//! - [`OsFilesystem`]: the real operating system filesystem
//! - [`MemoryFilesystem`]: a thread-safe in-memory tree, used for ephemeral
//!   stores and deterministic tests
//!
//! Both implementations follow the same rules so a store behaves identically
//! on either of them:
//!
//! - `stat` and `read_file` on a missing path fail with [`FsError::NotFound`]
//! - `stat` and `read_file` below an existing file fail with
//!   [`FsError::NotADirectory`]
//! - `read_file` on a directory fails with [`FsError::IsADirectory`]
//! - `write_file` requires the parent directory to exist
//! - `mkdir_all` through an existing file fails with [`FsError::NotADirectory`]

use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod memory;
pub mod os;

pub use memory::MemoryFilesystem;
pub use os::OsFilesystem;

/// Permission bits used when the store creates directories.
pub const DIR_PERM: u32 = 0o777;

/// Permission bits used when the store writes the backing file.
pub const FILE_PERM: u32 = 0o666;

/// Errors that can occur during filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    /// The path does not exist.
    #[error("No such file or directory: {}", .0.display())]
    NotFound(PathBuf),

    /// A file was expected but the path is a directory.
    #[error("Is a directory: {}", .0.display())]
    IsADirectory(PathBuf),

    /// A directory was expected but the path (or one of its ancestors) is a file.
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Any other I/O failure reported by the underlying system.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// Returns true when the error means the path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }
}

/// Minimal metadata returned by [`Filesystem::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    pub is_dir: bool,
    pub len: u64,
}

impl FileInfo {
    pub fn file(len: u64) -> Self {
        Self { is_dir: false, len }
    }

    pub fn dir() -> Self {
        Self { is_dir: true, len: 0 }
    }
}

/// Filesystem operations the record store depends on.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a single filesystem can be shared
/// between several stores.
#[cfg_attr(test, mockall::automock)]
pub trait Filesystem: Send + Sync + std::fmt::Debug {
    /// Return metadata for `path`, or [`FsError::NotFound`] if it does not exist.
    fn stat(&self, path: &Path) -> Result<FileInfo, FsError>;

    /// Read the full contents of the file at `path`.
    fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError>;

    /// Create or truncate the file at `path` and write `data` to it.
    fn write_file(&self, path: &Path, data: &[u8], perm: u32) -> Result<(), FsError>;

    /// Create `path` and all missing ancestors as directories.
    ///
    /// Succeeds if `path` already exists as a directory.
    fn mkdir_all(&self, path: &Path, perm: u32) -> Result<(), FsError>;

    /// Move the file at `from` to `to`, replacing any file already at `to`.
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;
}
