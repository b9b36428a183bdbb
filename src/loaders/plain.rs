//! Plain text embeds
//!
//! Including a text file yields its contents as a string.

use std::path::Path;

use super::escape::single_quoted;
use super::Loader;
use crate::builder::BuildContext;
use crate::error::{BuildError, BuildResult};

/// Embeds `.txt` / `.js` files as a string return value
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainLoader;

impl PlainLoader {
    pub fn new() -> Self {
        Self
    }
}

/// Module body returning `text`
pub fn string_body(text: &str) -> String {
    format!("return {};", single_quoted(text))
}

impl Loader for PlainLoader {
    fn name(&self) -> &str {
        "plaintext"
    }

    fn extensions(&self) -> Vec<String> {
        vec!["txt".to_string(), "js".to_string()]
    }

    fn process(&self, cx: &mut BuildContext<'_>, path: &Path, contents: &[u8]) -> BuildResult<()> {
        let text = std::str::from_utf8(contents).map_err(|e| BuildError::LoaderFailed {
            path: path.to_path_buf(),
            loader: self.name().to_string(),
            message: format!("not valid UTF-8: {}", e),
        })?;
        cx.register_unit(path, &string_body(text));
        Ok(())
    }
}
