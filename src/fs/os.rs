//! Operating system filesystem backend.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use super::{FileInfo, FsError, Filesystem};

/// Filesystem backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFilesystem;

impl OsFilesystem {
    pub fn new() -> Self {
        Self
    }
}

/// Map an `io::Error` onto the shared [`FsError`] vocabulary.
fn map_io_error(path: &Path, e: io::Error) -> FsError {
    match e.kind() {
        io::ErrorKind::NotFound => FsError::NotFound(path.to_path_buf()),
        io::ErrorKind::IsADirectory => FsError::IsADirectory(path.to_path_buf()),
        io::ErrorKind::NotADirectory => FsError::NotADirectory(path.to_path_buf()),
        _ => FsError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    }
}

impl Filesystem for OsFilesystem {
    fn stat(&self, path: &Path) -> Result<FileInfo, FsError> {
        let meta = fs::metadata(path).map_err(|e| map_io_error(path, e))?;
        if meta.is_dir() {
            Ok(FileInfo::dir())
        } else {
            Ok(FileInfo::file(meta.len()))
        }
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        // Some platforms happily open a directory for reading
        if self.stat(path)?.is_dir {
            return Err(FsError::IsADirectory(path.to_path_buf()));
        }
        fs::read(path).map_err(|e| map_io_error(path, e))
    }

    fn write_file(&self, path: &Path, data: &[u8], perm: u32) -> Result<(), FsError> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(perm);
        }
        #[cfg(not(unix))]
        let _ = perm;

        let mut file = options.open(path).map_err(|e| map_io_error(path, e))?;
        file.write_all(data).map_err(|e| map_io_error(path, e))?;
        file.flush().map_err(|e| map_io_error(path, e))
    }

    fn mkdir_all(&self, path: &Path, perm: u32) -> Result<(), FsError> {
        if path.as_os_str().is_empty() {
            return Ok(());
        }
        if let Ok(meta) = fs::metadata(path) {
            return if meta.is_dir() {
                Ok(())
            } else {
                Err(FsError::NotADirectory(path.to_path_buf()))
            };
        }

        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(perm);
        }
        #[cfg(not(unix))]
        let _ = perm;

        builder.create(path).map_err(|e| match e.kind() {
            // create_dir_all reports a file in the way as AlreadyExists
            io::ErrorKind::AlreadyExists => FsError::NotADirectory(path.to_path_buf()),
            _ => map_io_error(path, e),
        })
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        fs::rename(from, to).map_err(|e| map_io_error(from, e))
    }
}
