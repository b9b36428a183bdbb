//! Configuration type definitions

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{BuildError, BuildResult};
use crate::loaders::{normalize_extension, CommandLoader, Loader};

/// Contents of `phpinclude.toml`
///
/// ```toml
/// [extensions]
/// inc = "php"
/// js = false
///
/// [[loaders]]
/// name = "esbuild"
/// extensions = ["ts"]
/// command = ["esbuild", "{file}", "--bundle"]
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConfigFile {
    pub extensions: BTreeMap<String, ExtensionTarget>,
    pub loaders: Vec<CommandLoaderConfig>,
}

/// Right-hand side of an `[extensions]` entry
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ExtensionTarget {
    /// Handle the extension with this loader
    Loader(String),
    /// `false` drops the builtin claim; `true` is rejected
    Enabled(bool),
}

/// One `[[loaders]]` entry
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CommandLoaderConfig {
    pub name: String,
    #[serde(default)]
    pub extensions: Vec<String>,
    pub command: Vec<String>,
}

impl ConfigFile {
    /// Validate and turn into builder settings; `file` is for messages
    pub fn into_builder_config(self, file: &Path, diagnostics: bool) -> BuildResult<BuilderConfig> {
        let invalid = |message: String| BuildError::InvalidConfig {
            file: file.to_path_buf(),
            message,
        };

        let mut config = BuilderConfig::new().diagnostics(diagnostics);
        for (index, loader) in self.loaders.into_iter().enumerate() {
            if loader.name.trim().is_empty() {
                return Err(invalid(format!("loaders[{}] has an empty name", index)));
            }
            if loader
                .command
                .first()
                .map_or(true, |program| program.trim().is_empty())
            {
                return Err(invalid(format!(
                    "loader `{}` needs a non-empty command",
                    loader.name
                )));
            }
            config = config.with_loader(Arc::new(CommandLoader::new(
                loader.name,
                loader.extensions,
                loader.command,
            )));
        }
        for (ext, target) in self.extensions {
            config = match target {
                ExtensionTarget::Loader(name) => config.map_extension(&ext, name),
                ExtensionTarget::Enabled(false) => config.remove_extension(&ext),
                ExtensionTarget::Enabled(true) => {
                    return Err(invalid(format!(
                        "extension `{}` must map to a loader name or `false`",
                        ext
                    )))
                }
            };
        }
        Ok(config)
    }
}

/// Settings a `Builder` is constructed from
#[derive(Clone, Default)]
pub struct BuilderConfig {
    /// Loaders added after the builtins; later ones win extension conflicts
    pub loaders: Vec<Arc<dyn Loader>>,
    /// Extension -> loader name; `None` removes the extension
    pub extensions: BTreeMap<String, Option<String>>,
    /// Readable module ids and source comments in the artifact
    pub diagnostics: bool,
}

impl BuilderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader(mut self, loader: Arc<dyn Loader>) -> Self {
        self.loaders.push(loader);
        self
    }

    pub fn map_extension(mut self, ext: &str, loader: impl Into<String>) -> Self {
        self.extensions
            .insert(normalize_extension(ext), Some(loader.into()));
        self
    }

    pub fn remove_extension(mut self, ext: &str) -> Self {
        self.extensions.insert(normalize_extension(ext), None);
        self
    }

    pub fn diagnostics(mut self, diagnostics: bool) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

impl fmt::Debug for BuilderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.loaders.iter().map(|l| l.name()).collect();
        f.debug_struct("BuilderConfig")
            .field("loaders", &names)
            .field("extensions", &self.extensions)
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}
