//! External tool loaders
//!
//! Declared in `phpinclude.toml`:
//!
//! ```toml
//! [[loaders]]
//! name = "esbuild"
//! extensions = ["ts"]
//! command = ["esbuild", "{file}", "--bundle"]
//! ```
//!
//! The tool's stdout is embedded like a plain text file.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use super::plain::string_body;
use super::Loader;
use crate::builder::BuildContext;
use crate::error::{BuildError, BuildResult};

/// Placeholder replaced with the absolute source path
pub const FILE_PLACEHOLDER: &str = "{file}";

#[derive(Debug, Clone)]
pub struct CommandLoader {
    name: String,
    extensions: Vec<String>,
    command: Vec<String>,
}

impl CommandLoader {
    pub fn new(name: impl Into<String>, extensions: Vec<String>, command: Vec<String>) -> Self {
        Self {
            name: name.into(),
            extensions,
            command,
        }
    }

    /// Program and arguments for `path`
    fn argv(&self, path: &Path) -> Vec<String> {
        let file = path.to_string_lossy();
        self.command
            .iter()
            .map(|arg| arg.replace(FILE_PLACEHOLDER, &file))
            .collect()
    }

    fn failed(&self, path: &Path, message: String) -> BuildError {
        BuildError::LoaderFailed {
            path: path.to_path_buf(),
            loader: self.name.clone(),
            message,
        }
    }
}

impl Loader for CommandLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn extensions(&self) -> Vec<String> {
        self.extensions.clone()
    }

    fn process(&self, cx: &mut BuildContext<'_>, path: &Path, _contents: &[u8]) -> BuildResult<()> {
        let argv = self.argv(path);
        let Some((program, args)) = argv.split_first() else {
            return Err(self.failed(path, "empty command".to_string()));
        };
        debug!(loader = %self.name, command = ?argv, "running loader command");

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| self.failed(path, format!("could not run `{}`: {}", program, e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failed(
                path,
                format!("`{}` exited with {}: {}", program, output.status, stderr.trim()),
            ));
        }
        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| self.failed(path, format!("output is not valid UTF-8: {}", e)))?;

        cx.register_unit(path, &string_body(&stdout));
        Ok(())
    }
}
