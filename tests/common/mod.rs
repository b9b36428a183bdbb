//! Shared helpers for phpinclude integration tests.
//!
//! - `memory_builder`: a `Builder` over an in-memory tree
//! - `Project`: a temp directory plus a way to run the binary in it
//! - `id`: the module id a path gets outside diagnostics mode

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;

use phpinclude::{Builder, BuilderConfig, MemoryFs, ModuleId};
use tempfile::TempDir;

pub const OUT: &str = "/dest/index.php";

/// Builder reading from (and writing to) a fresh `MemoryFs`
pub fn memory_builder(files: &[(&str, &str)]) -> (Builder, MemoryFs) {
    memory_builder_with(BuilderConfig::default(), files)
}

pub fn memory_builder_with(config: BuilderConfig, files: &[(&str, &str)]) -> (Builder, MemoryFs) {
    let fs = MemoryFs::new();
    for (path, content) in files {
        fs.insert(path, *content);
    }
    let builder = Builder::new(config)
        .expect("builder config should be valid")
        .with_fs(Arc::new(fs.clone()));
    (builder, fs)
}

/// Build `entry` into `OUT` and return the bundle
pub fn bundle(files: &[(&str, &str)], entry: &str) -> String {
    let (mut builder, fs) = memory_builder(files);
    builder
        .build_entry(Path::new(entry), Path::new(OUT))
        .expect("build should succeed");
    fs.get(OUT).expect("bundle should be written")
}

pub fn id(path: &str) -> ModuleId {
    ModuleId::from_path(Path::new(path), false)
}

/// Result of running the binary
#[derive(Debug)]
pub struct RunResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl RunResult {
    fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Project directory on disk
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Write a file, creating parent directories
    pub fn write(&self, relative: &str, content: &str) -> &Self {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(path, content).expect("write fixture");
        self
    }

    pub fn read(&self, relative: &str) -> Option<String> {
        std::fs::read_to_string(self.path(relative)).ok()
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_phpinclude"));
        cmd.current_dir(self.dir.path())
            .env_remove("PHPINCLUDE_ENV")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Run the binary in the project directory
    pub fn run(&self, args: &[&str]) -> RunResult {
        self.run_with_env(args, &[])
    }

    pub fn run_with_env(&self, args: &[&str], env: &[(&str, &str)]) -> RunResult {
        let mut cmd = self.command();
        cmd.args(args);
        for (key, value) in env {
            cmd.env(key, value);
        }
        RunResult::from_output(cmd.output().expect("failed to run phpinclude"))
    }
}

/// `php` on PATH, if any
pub fn php_binary() -> Option<PathBuf> {
    Command::new("php")
        .arg("-v")
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|_| PathBuf::from("php"))
}
