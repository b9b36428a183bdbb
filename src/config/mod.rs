//! Configuration for phpinclude
//!
//! Sources, highest priority first:
//! 1. CLI flags (`--config`, `--dev`)
//! 2. Environment (`PHPINCLUDE_ENV=development`)
//! 3. `phpinclude.toml` in the working directory
//! 4. Built-in defaults

mod loader;
#[cfg(test)]
mod tests;
mod types;

pub use loader::{
    diagnostics_from_env, discover, load, load_builder_config, parse, CONFIG_FILE, ENV_VAR,
};
pub use types::{BuilderConfig, CommandLoaderConfig, ConfigFile, ExtensionTarget};
