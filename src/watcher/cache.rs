//! Content hashes of watched sources

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::fs::FileSystem;

/// Hex sha256 of `content`
pub fn compute_content_hash(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

/// Last seen hash per source file.
///
/// Editors and `notify` report plenty of events that do not change any
/// bytes; those are filtered here.
#[derive(Debug, Default)]
pub struct ContentHashes {
    hashes: HashMap<PathBuf, String>,
}

impl ContentHashes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Store the hash of `content`; true if it differs from the last one
    pub fn record(&mut self, path: &Path, content: &[u8]) -> bool {
        let hash = compute_content_hash(content);
        match self.hashes.get(path) {
            Some(old) if *old == hash => false,
            _ => {
                self.hashes.insert(path.to_path_buf(), hash);
                true
            }
        }
    }

    /// Forget a deleted file; true if it was known
    pub fn forget(&mut self, path: &Path) -> bool {
        self.hashes.remove(path).is_some()
    }

    /// Hash files not seen before, reading them from `fs`
    pub fn seed<'a>(&mut self, fs: &dyn FileSystem, paths: impl IntoIterator<Item = &'a Path>) {
        for path in paths {
            if self.hashes.contains_key(path) {
                continue;
            }
            if let Ok(content) = fs.read(path) {
                self.hashes
                    .insert(path.to_path_buf(), compute_content_hash(&content));
            }
        }
    }
}
