//! File system port
//!
//! The builder only touches the disk through this trait, so whole builds can
//! run against an in-memory tree:
//! - `LocalFs` - standard file I/O with atomic writes
//! - `MemoryFs` - in-memory map, shared between clones

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Abstract file system interface
pub trait FileSystem: Send + Sync {
    /// Read file content as raw bytes
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write content atomically, creating parent directories
    fn write_atomic(&self, path: &Path, content: &[u8]) -> io::Result<()>;

    /// Check if file exists
    fn exists(&self, path: &Path) -> bool;

    /// Absolute, normalised form of `path`.
    ///
    /// Never fails: paths that do not exist are normalised lexically.
    fn canonicalize(&self, path: &Path) -> PathBuf;
}

/// Local file system implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    /// Create a new LocalFs instance
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write_atomic(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        // Temp file in the target directory so the rename stays on one device
        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn canonicalize(&self, path: &Path) -> PathBuf {
        if let Ok(real) = std::fs::canonicalize(path) {
            return real;
        }
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        };
        normalize_path(&absolute)
    }
}

/// In-memory file system
///
/// Uses `Arc<Mutex<>>` internally so it can be cloned and shared between the
/// builder and the test (or embedder) that edits files.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a file
    pub fn insert(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = normalize_path(path.as_ref());
        self.lock().insert(path, content.into());
    }

    /// Delete a file, returning whether it existed
    pub fn remove(&self, path: impl AsRef<Path>) -> bool {
        let path = normalize_path(path.as_ref());
        self.lock().remove(&path).is_some()
    }

    /// Read a file as UTF-8 (lossy)
    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        let path = normalize_path(path.as_ref());
        self.lock()
            .get(&path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Vec<u8>>> {
        // A poisoned map is still a valid map
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl FileSystem for MemoryFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let path = normalize_path(path);
        self.lock().get(&path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
        })
    }

    fn write_atomic(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        self.insert(path, content.to_vec());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(&normalize_path(path))
    }

    fn canonicalize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            normalize_path(path)
        } else {
            normalize_path(&Path::new("/").join(path))
        }
    }
}

/// Resolve `.` and `..` components without touching the disk
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if popped {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
