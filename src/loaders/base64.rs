//! Binary embeds
//!
//! Bytes are stored base64-encoded and decoded at run time.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::Loader;
use crate::builder::BuildContext;
use crate::error::BuildResult;

/// Embeds `.bin` files as a decoded binary string
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Loader;

impl Base64Loader {
    pub fn new() -> Self {
        Self
    }
}

fn binary_body(bytes: &[u8]) -> String {
    // the alphabet has no quotes or backslashes
    format!("return base64_decode('{}', true);", STANDARD.encode(bytes))
}

impl Loader for Base64Loader {
    fn name(&self) -> &str {
        "base64"
    }

    fn extensions(&self) -> Vec<String> {
        vec!["bin".to_string()]
    }

    fn process(&self, cx: &mut BuildContext<'_>, path: &Path, contents: &[u8]) -> BuildResult<()> {
        cx.register_unit(path, &binary_body(contents));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_decodes_strictly() {
        assert_eq!(
            binary_body(&[0, 159, 146, 150]),
            "return base64_decode('AJ+Slg==', true);"
        );
    }
}
