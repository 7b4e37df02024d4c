//! In-memory filesystem backend.
//!
//! This module provides an implementation of the [`Filesystem`] trait that
//! keeps a tree of files and directories in a `DashMap`. Clones share the same
//! tree, so several stores can be opened over one `MemoryFilesystem` to
//! simulate a restart without touching the disk.

use dashmap::DashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use super::{FileInfo, FsError, Filesystem};

#[derive(Debug, Clone)]
enum Node {
    File { data: Vec<u8>, perm: u32 },
    Dir { perm: u32 },
}

/// In-memory filesystem
///
/// # Performance Characteristics
///
/// - No disk I/O
/// - Every entry is keyed by its normalized absolute path
/// - Data is lost when the last clone is dropped
#[derive(Debug, Clone)]
pub struct MemoryFilesystem {
    nodes: Arc<DashMap<PathBuf, Node>>,
}

impl Default for MemoryFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFilesystem {
    /// Create an empty filesystem containing only the root directory.
    pub fn new() -> Self {
        let nodes = DashMap::new();
        nodes.insert(PathBuf::from("/"), Node::Dir { perm: 0o755 });
        Self {
            nodes: Arc::new(nodes),
        }
    }

    /// Permission bits recorded for `path`, if it exists.
    pub fn permissions(&self, path: &Path) -> Option<u32> {
        self.nodes.get(&normalize(path)).map(|node| match node.value() {
            Node::File { perm, .. } | Node::Dir { perm } => *perm,
        })
    }

    /// Error for a lookup of `key` that found no node.
    ///
    /// A file standing in for one of the ancestors is reported as
    /// [`FsError::NotADirectory`], matching what the OS does for `ENOTDIR`.
    fn missing(&self, key: &Path, path: &Path) -> FsError {
        let blocked = key
            .ancestors()
            .skip(1)
            .any(|ancestor| {
                matches!(self.nodes.get(ancestor).as_deref(), Some(Node::File { .. }))
            });
        if blocked {
            FsError::NotADirectory(path.to_path_buf())
        } else {
            FsError::NotFound(path.to_path_buf())
        }
    }
}

/// Resolve `path` to an absolute path without `.` or `..` components.
///
/// Relative paths are rooted at `/`.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::ParentDir => {
                out.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    out
}

impl Filesystem for MemoryFilesystem {
    fn stat(&self, path: &Path) -> Result<FileInfo, FsError> {
        let key = normalize(path);
        match self.nodes.get(&key).as_deref() {
            Some(Node::File { data, .. }) => Ok(FileInfo::file(data.len() as u64)),
            Some(Node::Dir { .. }) => Ok(FileInfo::dir()),
            None => Err(self.missing(&key, path)),
        }
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        let key = normalize(path);
        match self.nodes.get(&key).as_deref() {
            Some(Node::File { data, .. }) => Ok(data.clone()),
            Some(Node::Dir { .. }) => Err(FsError::IsADirectory(path.to_path_buf())),
            None => Err(self.missing(&key, path)),
        }
    }

    fn write_file(&self, path: &Path, data: &[u8], perm: u32) -> Result<(), FsError> {
        let key = normalize(path);
        if let Some(parent) = key.parent() {
            match self.nodes.get(parent).as_deref() {
                Some(Node::Dir { .. }) => {}
                Some(Node::File { .. }) => {
                    return Err(FsError::NotADirectory(parent.to_path_buf()));
                }
                None => return Err(FsError::NotFound(parent.to_path_buf())),
            }
        }

        let mut entry = self.nodes.entry(key).or_insert(Node::File {
            data: Vec::new(),
            perm,
        });
        match entry.value_mut() {
            // Existing files keep their permissions, like an O_TRUNC open
            Node::File { data: existing, .. } => {
                existing.clear();
                existing.extend_from_slice(data);
                Ok(())
            }
            Node::Dir { .. } => Err(FsError::IsADirectory(path.to_path_buf())),
        }
    }

    fn mkdir_all(&self, path: &Path, perm: u32) -> Result<(), FsError> {
        let target = normalize(path);
        let mut current = PathBuf::from("/");
        for component in target.components().skip(1) {
            current.push(component);
            let existing = self.nodes.get(&current).map(|n| n.value().clone());
            match existing {
                Some(Node::Dir { .. }) => {}
                Some(Node::File { .. }) => return Err(FsError::NotADirectory(current)),
                None => {
                    self.nodes.insert(current.clone(), Node::Dir { perm });
                }
            }
        }
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        let from_key = normalize(from);
        let to_key = normalize(to);
        if from_key == to_key {
            return self.stat(from).map(|_| ());
        }

        match self.nodes.get(&to_key).as_deref() {
            Some(Node::Dir { .. }) => return Err(FsError::IsADirectory(to.to_path_buf())),
            Some(Node::File { .. }) | None => {}
        }
        match self.nodes.get(&from_key).as_deref() {
            Some(Node::File { .. }) => {}
            Some(Node::Dir { .. }) => return Err(FsError::IsADirectory(from.to_path_buf())),
            None => return Err(FsError::NotFound(from.to_path_buf())),
        }
        if let Some(parent) = to_key.parent() {
            if !matches!(self.nodes.get(parent).as_deref(), Some(Node::Dir { .. })) {
                return Err(FsError::NotFound(parent.to_path_buf()));
            }
        }

        let (_, node) = self
            .nodes
            .remove(&from_key)
            .ok_or_else(|| FsError::NotFound(from.to_path_buf()))?;
        self.nodes.insert(to_key, node);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_root_exists() {
        let fs = MemoryFilesystem::new();
        assert_eq!(fs.stat(Path::new("/")).unwrap(), FileInfo::dir());
    }

    #[test]
    fn test_missing_is_not_found() {
        let fs = MemoryFilesystem::new();

        assert!(fs.stat(Path::new("/nope")).unwrap_err().is_not_found());
        assert!(fs.read_file(Path::new("/nope")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_write_requires_parent() {
        let fs = MemoryFilesystem::new();

        let err = fs
            .write_file(Path::new("/a/b/file.json"), b"{}", 0o644)
            .unwrap_err();
        assert!(err.is_not_found());

        fs.mkdir_all(Path::new("/a/b"), 0o755).unwrap();
        fs.write_file(Path::new("/a/b/file.json"), b"{}", 0o644)
            .unwrap();
        assert_eq!(
            fs.read_file(Path::new("/a/b/file.json")).unwrap(),
            b"{}".to_vec()
        );
    }

    #[test]
    fn test_write_truncates_and_keeps_permissions() {
        let fs = MemoryFilesystem::new();
        let path = Path::new("/file");

        fs.write_file(path, b"long content", 0o600).unwrap();
        fs.write_file(path, b"short", 0o644).unwrap();

        assert_eq!(fs.read_file(path).unwrap(), b"short".to_vec());
        assert_eq!(fs.stat(path).unwrap(), FileInfo::file(5));
        assert_eq!(fs.permissions(path), Some(0o600));
    }

    #[test]
    fn test_directory_semantics() {
        let fs = MemoryFilesystem::new();
        fs.mkdir_all(Path::new("/dir/sub"), 0o755).unwrap();

        assert!(fs.stat(Path::new("/dir")).unwrap().is_dir);
        assert!(matches!(
            fs.read_file(Path::new("/dir")).unwrap_err(),
            FsError::IsADirectory(_)
        ));
        assert!(matches!(
            fs.write_file(Path::new("/dir/sub"), b"x", 0o644).unwrap_err(),
            FsError::IsADirectory(_)
        ));

        fs.write_file(Path::new("/dir/file"), b"x", 0o644).unwrap();
        assert!(matches!(
            fs.mkdir_all(Path::new("/dir/file/deeper"), 0o755)
                .unwrap_err(),
            FsError::NotADirectory(_)
        ));
    }

    #[test]
    fn test_stat_through_file_is_not_a_directory() {
        let fs = MemoryFilesystem::new();
        fs.write_file(Path::new("/d"), b"plain file", 0o644).unwrap();

        assert!(matches!(
            fs.stat(Path::new("/d/m.json")).unwrap_err(),
            FsError::NotADirectory(_)
        ));
        assert!(matches!(
            fs.read_file(Path::new("/d/sub/m.json")).unwrap_err(),
            FsError::NotADirectory(_)
        ));
        // A missing ancestor is still plain NotFound
        assert!(fs.stat(Path::new("/e/m.json")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_paths_are_normalized() {
        let fs = MemoryFilesystem::new();
        fs.mkdir_all(Path::new("/x/./y/../z"), 0o755).unwrap();
        fs.write_file(Path::new("x/z/file"), b"data", 0o644).unwrap();

        assert_eq!(
            fs.read_file(Path::new("/x/z/file")).unwrap(),
            b"data".to_vec()
        );
        assert!(fs.stat(Path::new("/x/y")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_clones_share_state() {
        let fs = MemoryFilesystem::new();
        let clone = fs.clone();

        clone.write_file(Path::new("/shared"), b"1", 0o644).unwrap();

        assert_eq!(fs.read_file(Path::new("/shared")).unwrap(), b"1".to_vec());
    }

    #[test]
    fn test_rename() {
        let fs = MemoryFilesystem::new();
        fs.write_file(Path::new("/tmp_file"), b"new", 0o644).unwrap();
        fs.write_file(Path::new("/target"), b"old", 0o644).unwrap();

        fs.rename(Path::new("/tmp_file"), Path::new("/target"))
            .unwrap();

        assert!(fs.stat(Path::new("/tmp_file")).unwrap_err().is_not_found());
        assert_eq!(fs.read_file(Path::new("/target")).unwrap(), b"new".to_vec());
        assert!(fs
            .rename(Path::new("/tmp_file"), Path::new("/target"))
            .unwrap_err()
            .is_not_found());
    }
}
