//! Module identifier value object
//!
//! Every unit in the artifact is a PHP function named after its module id.
//! The id depends only on the canonical source path, so every include site
//! that resolves to the same file addresses the same module.

use std::fmt;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Identifier of one bundled module, also a valid PHP function name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(String);

impl ModuleId {
    /// Prefix shared by every module function
    pub const PREFIX: &'static str = "__module_";

    /// Hex digits of the path digest kept in the id (128 bits)
    const DIGEST_LEN: usize = 32;

    /// Compute the id of `path`.
    ///
    /// In diagnostics mode a sanitised file stem is appended; it is for
    /// humans reading the artifact and never used for lookups.
    pub fn from_path(path: &Path, diagnostics: bool) -> Self {
        let digest = Sha256::digest(path.to_string_lossy().as_bytes());
        let hex = format!("{:x}", digest);
        let mut id = format!("{}{}", Self::PREFIX, &hex[..Self::DIGEST_LEN]);
        if diagnostics {
            if let Some(stem) = path.file_stem() {
                let stem: String = stem
                    .to_string_lossy()
                    .chars()
                    .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                    .collect();
                id.push_str("__");
                id.push_str(&stem);
            }
        }
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModuleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
