//! File loaders
//!
//! A loader turns one file into a module body and hands it to the builder
//! through `BuildContext`. Which loader handles a file is decided by its
//! extension:
//! - builtins claim their extensions first
//! - configured loaders come next, later ones overriding earlier claims
//! - the `[extensions]` table overrides everything; `false` drops a claim

pub mod base64;
pub mod command;
pub mod escape;
pub mod php;
pub mod plain;

pub use self::base64::Base64Loader;
pub use command::CommandLoader;
pub use php::PhpLoader;
pub use plain::PlainLoader;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::builder::BuildContext;
use crate::error::{BuildError, BuildResult};

/// Capability every file processor implements
pub trait Loader: Send + Sync {
    /// Name used by the `[extensions]` table
    fn name(&self) -> &str;

    /// Extensions claimed by default, without the leading dot
    fn extensions(&self) -> Vec<String>;

    /// Turn `contents` into a module and register it with `cx`.
    ///
    /// Loaders that discover includes request them through `cx.include`
    /// after registering their own unit.
    fn process(&self, cx: &mut BuildContext<'_>, path: &Path, contents: &[u8]) -> BuildResult<()>;
}

/// Loaders shipped with phpinclude
pub fn builtin_loaders() -> Vec<Arc<dyn Loader>> {
    vec![
        Arc::new(PhpLoader::new()),
        Arc::new(PlainLoader::new()),
        Arc::new(Base64Loader::new()),
    ]
}

/// `.PHP` and `php` both become `php`
pub fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_ascii_lowercase()
}

/// Registered loaders plus the extension table
pub struct LoaderSet {
    loaders: Vec<Arc<dyn Loader>>,
    by_extension: BTreeMap<String, Arc<dyn Loader>>,
}

impl LoaderSet {
    /// Builtins, then `extra` in order, then the `extensions` overrides.
    ///
    /// Fails if an override names a loader nobody registered.
    pub fn new(
        extra: &[Arc<dyn Loader>],
        extensions: &BTreeMap<String, Option<String>>,
    ) -> BuildResult<Self> {
        let mut set = Self {
            loaders: Vec::new(),
            by_extension: BTreeMap::new(),
        };
        for loader in builtin_loaders().into_iter().chain(extra.iter().cloned()) {
            set.add(loader);
        }

        for (ext, name) in extensions {
            let ext = normalize_extension(ext);
            match name {
                None => {
                    set.by_extension.remove(&ext);
                }
                Some(name) => {
                    let loader = set.by_name(name).ok_or_else(|| BuildError::UnknownLoader {
                        name: name.clone(),
                        extension: ext.clone(),
                    })?;
                    set.by_extension.insert(ext, loader);
                }
            }
        }
        Ok(set)
    }

    fn add(&mut self, loader: Arc<dyn Loader>) {
        for ext in loader.extensions() {
            self.by_extension
                .insert(normalize_extension(&ext), Arc::clone(&loader));
        }
        self.loaders.push(loader);
    }

    /// Last registered loader called `name`
    pub fn by_name(&self, name: &str) -> Option<Arc<dyn Loader>> {
        self.loaders.iter().rev().find(|l| l.name() == name).cloned()
    }

    /// Loader claiming the extension of `path`
    pub fn for_path(&self, path: &Path) -> Option<Arc<dyn Loader>> {
        let ext = normalize_extension(&path.extension()?.to_string_lossy());
        self.by_extension.get(&ext).cloned()
    }

    /// Claimed extensions with the name of the loader handling each
    pub fn claims(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_extension
            .iter()
            .map(|(ext, loader)| (ext.as_str(), loader.name()))
    }
}

impl Default for LoaderSet {
    fn default() -> Self {
        let mut set = Self {
            loaders: Vec::new(),
            by_extension: BTreeMap::new(),
        };
        for loader in builtin_loaders() {
            set.add(loader);
        }
        set
    }
}
