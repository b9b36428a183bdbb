//! phpinclude - PHP include bundler
//!
//! Follows `include` / `require` (and their `_once` forms) from an entry
//! script, turns every reached file into a function inside one artifact and
//! replaces each include with a call to a runtime dispatcher. The builder is
//! incremental: after the first build, changed files are reprocessed one at
//! a time and the artifact is reassembled from cached units.
//!
//! ```no_run
//! use std::path::Path;
//! use phpinclude::{Builder, BuilderConfig};
//!
//! let mut builder = Builder::new(BuilderConfig::default())?;
//! builder.build_entry(Path::new("src/index.php"), Path::new("dest/index.php"))?;
//! # Ok::<(), phpinclude::BuildError>(())
//! ```

pub mod artifact;
pub mod builder;
pub mod config;
pub mod error;
pub mod events;
pub mod fs;
pub mod loaders;
pub mod logging;
pub mod module_id;
pub mod php;
pub mod registry;
pub mod watcher;

// Re-exports for convenience
pub use builder::{BuildContext, Builder};
pub use config::{BuilderConfig, ConfigFile};
pub use error::{BuildError, BuildResult};
pub use events::{BuildEvent, BuildEventSink, NoopEventSink};
pub use fs::{FileSystem, LocalFs, MemoryFs};
pub use loaders::{Loader, LoaderSet};
pub use module_id::ModuleId;
pub use registry::{Registry, Unit};
pub use watcher::{WatchEvent, WatchOptions, WatchUseCase};
