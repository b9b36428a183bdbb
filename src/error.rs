//! Error types for phpinclude
//!
//! Uses `thiserror` for library errors; the binary wraps them in `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for phpinclude operations
pub type BuildResult<T> = Result<T, BuildError>;

/// Main error type for build operations
#[derive(Error, Debug)]
pub enum BuildError {
    /// Source file could not be read
    #[error("error reading file `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Artifact could not be written
    #[error("error writing `{}`: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// PHP syntax error
    #[error("parse error in {}:{line}:{column}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    /// Include target is not a constant string
    #[error(
        "dynamic include in {}:{line}:{column} - only constant string targets can be bundled",
        path.display()
    )]
    DynamicInclude {
        path: PathBuf,
        line: usize,
        column: usize,
    },

    /// Construct that cannot be moved into a module function
    #[error("unsupported syntax `{kind}` in {}:{line}", path.display())]
    UnsupportedSyntax {
        path: PathBuf,
        kind: String,
        line: usize,
    },

    /// No loader claims the file extension
    #[error("file type of `{}` is not supported (no loader for its extension)", path.display())]
    UnsupportedFileType { path: PathBuf },

    /// Extension mapped to a loader name nobody registered
    #[error("no loader named `{name}` known for extension `{extension}`")]
    UnknownLoader { name: String, extension: String },

    /// A loader failed to produce a module
    #[error("loader `{loader}` failed on `{}`: {message}", path.display())]
    LoaderFailed {
        path: PathBuf,
        loader: String,
        message: String,
    },

    /// A required include could not be built
    #[error("could not include `{}` from `{}`", target.display(), includer.display())]
    IncludeFailed {
        includer: PathBuf,
        target: PathBuf,
        #[source]
        source: Box<BuildError>,
    },

    /// Include cycle without any `_once` edge
    #[error("cyclic include without `_once`: {}", format_chain(chain))]
    CyclicInclude { chain: Vec<PathBuf> },

    /// Entry file has no unit in the registry
    #[error("entry `{}` has not been built", path.display())]
    EntryNotBuilt { path: PathBuf },

    /// Configuration has the wrong shape
    #[error("invalid configuration in {}: {message}", file.display())]
    InvalidConfig { file: PathBuf, message: String },

    /// Configuration contains keys nobody reads
    #[error("unknown configuration key(s) in {}: {}", file.display(), keys.join(", "))]
    UnknownConfigKeys { file: PathBuf, keys: Vec<String> },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// Path of the source file the error points at, if any
    pub fn file(&self) -> Option<&std::path::Path> {
        match self {
            BuildError::Read { path, .. }
            | BuildError::Write { path, .. }
            | BuildError::Parse { path, .. }
            | BuildError::DynamicInclude { path, .. }
            | BuildError::UnsupportedSyntax { path, .. }
            | BuildError::UnsupportedFileType { path }
            | BuildError::LoaderFailed { path, .. }
            | BuildError::EntryNotBuilt { path } => Some(path),
            BuildError::IncludeFailed { includer, .. } => Some(includer),
            BuildError::InvalidConfig { file, .. } | BuildError::UnknownConfigKeys { file, .. } => {
                Some(file)
            }
            BuildError::CyclicInclude { chain } => chain.first().map(|p| p.as_path()),
            BuildError::UnknownLoader { .. } | BuildError::Io(_) => None,
        }
    }

    /// Innermost error of an include chain
    pub fn root_cause(&self) -> &BuildError {
        let mut current = self;
        while let BuildError::IncludeFailed { source, .. } = current {
            current = source;
        }
        current
    }
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
