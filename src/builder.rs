//! Incremental bundle builder
//!
//! Drives loaders over the include graph and keeps the registry in step
//! with the sources:
//! - `build_entry` builds everything reachable from the entry and writes
//!   the artifact
//! - `rebuild_file` / `remove_file` apply one changed or deleted source
//! - `rebuild_with_entry` prunes and rewrites the artifact afterwards
//!
//! Includes are built depth-first in source order, so identical inputs give
//! identical artifacts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::artifact;
use crate::config::BuilderConfig;
use crate::error::{BuildError, BuildResult};
use crate::events::{BuildEvent, BuildEventSink, NoopEventSink};
use crate::fs::{FileSystem, LocalFs};
use crate::loaders::{Loader, LoaderSet};
use crate::module_id::ModuleId;
use crate::php::IncludeKind;
use crate::registry::Registry;

pub struct Builder {
    registry: Registry,
    loaders: LoaderSet,
    fs: Arc<dyn FileSystem>,
    events: Arc<dyn BuildEventSink>,
    diagnostics: bool,
    /// Files being processed, with whether the edge into each was `_once`
    building: Vec<(PathBuf, bool)>,
    entry: Option<PathBuf>,
}

impl Builder {
    /// Builder over the local disk.
    ///
    /// Fails if the extension table names an unknown loader.
    pub fn new(config: BuilderConfig) -> BuildResult<Self> {
        Ok(Self {
            registry: Registry::new(),
            loaders: LoaderSet::new(&config.loaders, &config.extensions)?,
            fs: Arc::new(LocalFs::new()),
            events: Arc::new(NoopEventSink),
            diagnostics: config.diagnostics,
            building: Vec::new(),
            entry: None,
        })
    }

    /// Use another file system
    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Subscribe to build events
    pub fn with_event_sink(mut self, events: Arc<dyn BuildEventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// File system sources are read from
    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn loaders(&self) -> &LoaderSet {
        &self.loaders
    }

    pub fn diagnostics(&self) -> bool {
        self.diagnostics
    }

    /// Canonical form of `path` as used for registry keys
    pub fn canonicalize(&self, path: &Path) -> PathBuf {
        self.fs.canonicalize(path)
    }

    /// Build `entry` and everything it includes, then write the artifact.
    ///
    /// Nothing is written if the entry fails to build.
    pub fn build_entry(&mut self, entry: &Path, output: &Path) -> BuildResult<()> {
        let entry = self.fs.canonicalize(entry);
        self.build_file(&entry, None, true)?;
        self.registry.put_entry(&entry);
        self.entry = Some(entry);
        self.rebuild_with_entry(output)
    }

    /// Prune and write the artifact for the current entry
    pub fn rebuild_with_entry(&mut self, output: &Path) -> BuildResult<()> {
        for path in self.registry.prune() {
            debug!(path = %path.display(), "pruned");
            self.events.on_event(BuildEvent::Pruned { path });
        }
        let entry = match (&self.entry, self.registry.entry()) {
            (_, Some(entry)) => entry.to_path_buf(),
            (Some(entry), None) => {
                return Err(BuildError::EntryNotBuilt {
                    path: entry.clone(),
                })
            }
            (None, None) => {
                return Err(BuildError::EntryNotBuilt {
                    path: PathBuf::new(),
                })
            }
        };

        let bundle = artifact::assemble(&self.registry)?;
        self.fs
            .write_atomic(output, bundle.as_bytes())
            .map_err(|source| BuildError::Write {
                path: output.to_path_buf(),
                source,
            })?;

        let units = self.registry.present_units().count();
        info!(
            entry = %entry.display(),
            output = %output.display(),
            units,
            "wrote bundle"
        );
        self.events.on_event(BuildEvent::EntryBuilt {
            entry,
            output: output.to_path_buf(),
            units,
        });
        Ok(())
    }

    /// Process `path` with the loader claiming its extension.
    ///
    /// `contents` is read from disk when not given. An unreadable file is an
    /// error only when `required`; otherwise it is skipped with a warning.
    pub fn build_file(
        &mut self,
        path: &Path,
        contents: Option<Vec<u8>>,
        required: bool,
    ) -> BuildResult<()> {
        let path = self.fs.canonicalize(path);
        let loader = self.loader_for(&path)?;
        self.process(&path, contents, required, false, loader)
    }

    /// Process `path` with an explicit loader
    pub fn build_file_with_loader(
        &mut self,
        path: &Path,
        contents: Option<Vec<u8>>,
        required: bool,
        loader: Arc<dyn Loader>,
    ) -> BuildResult<()> {
        let path = self.fs.canonicalize(path);
        self.process(&path, contents, required, false, loader)
    }

    /// Reuse the unit for `path` if there is one, else build it
    pub fn build_file_if_not_cached(&mut self, path: &Path, required: bool) -> BuildResult<()> {
        let path = self.fs.canonicalize(path);
        if self.registry.contains(&path) {
            self.registry.register_includes(&path);
            return Ok(());
        }
        self.build_file(&path, None, required)
    }

    /// Reprocess a file whose contents changed.
    ///
    /// Its old includes are withdrawn first, so files only it kept alive
    /// become prunable unless the new contents include them again.
    pub fn rebuild_file(
        &mut self,
        path: &Path,
        contents: Option<Vec<u8>>,
        required: bool,
    ) -> BuildResult<()> {
        let path = self.fs.canonicalize(path);
        if self.registry.contains(&path) {
            self.registry.remove_abandoned(&path);
        }
        self.build_file(&path, contents, required)
    }

    /// Drop a deleted file and rebuild everything that included it
    pub fn remove_file(&mut self, path: &Path) -> BuildResult<()> {
        let path = self.fs.canonicalize(path);
        let Some(unit) = self.registry.get(&path) else {
            return Ok(());
        };
        let includers: Vec<PathBuf> = unit.included_by().map(Path::to_path_buf).collect();
        self.registry.remove_abandoned(&path);
        self.registry.remove(&path);
        debug!(path = %path.display(), "removed");

        for includer in includers {
            if self.registry.contains(&includer) {
                self.rebuild_file(&includer, None, true)?;
            }
        }
        Ok(())
    }

    fn loader_for(&self, path: &Path) -> BuildResult<Arc<dyn Loader>> {
        self.loaders
            .for_path(path)
            .ok_or_else(|| BuildError::UnsupportedFileType {
                path: path.to_path_buf(),
            })
    }

    fn process(
        &mut self,
        path: &Path,
        contents: Option<Vec<u8>>,
        required: bool,
        via_once: bool,
        loader: Arc<dyn Loader>,
    ) -> BuildResult<()> {
        let contents = match contents {
            Some(contents) => contents,
            None => match self.fs.read(path) {
                Ok(contents) => contents,
                Err(source) if required => {
                    return Err(BuildError::Read {
                        path: path.to_path_buf(),
                        source,
                    })
                }
                Err(err) => {
                    warn!("skipping optional file {}: {}", path.display(), err);
                    return Ok(());
                }
            },
        };

        let previous = self.registry.get(path).cloned();
        let is_new = previous.is_none();
        self.building.push((path.to_path_buf(), via_once));
        let result = loader.process(&mut BuildContext { builder: self }, path, &contents);
        self.building.pop();

        if let Err(err) = result {
            match previous {
                // keep the last good version wired up
                Some(previous) => self.registry.restore(previous),
                None => {
                    self.registry.remove(path);
                }
            }
            return Err(err);
        }

        let Some(unit) = self.registry.get(path) else {
            return Err(BuildError::LoaderFailed {
                path: path.to_path_buf(),
                loader: loader.name().to_string(),
                message: "loader registered no module".to_string(),
            });
        };
        let module_id = unit.module_id().clone();
        debug!(path = %path.display(), loader = loader.name(), "built");
        if is_new {
            self.events.on_event(BuildEvent::FileAdded {
                path: path.to_path_buf(),
                module_id: module_id.clone(),
            });
        }
        self.events.on_event(BuildEvent::Built {
            path: path.to_path_buf(),
            module_id,
        });
        Ok(())
    }

    /// Build or reuse `target` and record the edge from `from`
    fn include(&mut self, from: &Path, target: &Path, kind: IncludeKind) -> BuildResult<()> {
        if let Some(pos) = self.building.iter().position(|(p, _)| p == target) {
            let guarded = kind.once() || self.building[pos + 1..].iter().any(|(_, once)| *once);
            if !guarded {
                let mut chain: Vec<PathBuf> =
                    self.building[pos..].iter().map(|(p, _)| p.clone()).collect();
                chain.push(target.to_path_buf());
                return Err(BuildError::CyclicInclude { chain });
            }
            // runtime dedup ends the cycle
            self.registry.link(from, target, kind.once());
            return Ok(());
        }

        let result = if self.registry.contains(target) {
            if !kind.once() {
                if let Some(mut chain) = self.registry.unguarded_path(target, from) {
                    chain.push(target.to_path_buf());
                    return Err(BuildError::CyclicInclude { chain });
                }
            }
            self.registry.register_includes(target);
            Ok(())
        } else {
            match self.loader_for(target) {
                Ok(loader) => self.process(target, None, kind.required(), kind.once(), loader),
                Err(err) => Err(err),
            }
        };

        match result {
            Ok(()) => {
                self.registry.link(from, target, kind.once());
                Ok(())
            }
            Err(err)
                if kind.required()
                    || matches!(err.root_cause(), BuildError::CyclicInclude { .. }) =>
            {
                Err(BuildError::IncludeFailed {
                    includer: from.to_path_buf(),
                    target: target.to_path_buf(),
                    source: Box::new(err),
                })
            }
            Err(err) => {
                warn!(
                    "{} in {} failed, continuing without it: {}",
                    kind.keyword(),
                    from.display(),
                    err
                );
                Ok(())
            }
        }
    }
}

/// What a loader may do while processing one file
pub struct BuildContext<'a> {
    builder: &'a mut Builder,
}

impl BuildContext<'_> {
    pub fn fs(&self) -> &dyn FileSystem {
        self.builder.fs.as_ref()
    }

    pub fn diagnostics(&self) -> bool {
        self.builder.diagnostics
    }

    pub fn module_id(&self, path: &Path) -> ModuleId {
        ModuleId::from_path(path, self.builder.diagnostics)
    }

    /// Wrap `body` as the module for `path` and store it
    pub fn register_unit(&mut self, path: &Path, body: &str) -> ModuleId {
        let id = self.module_id(path);
        let source = self.builder.diagnostics.then_some(path);
        let module = artifact::wrap_module(&id, body, source);
        self.builder.registry.register(path, id.clone(), module);
        id
    }

    /// Build `target` (or reuse it) as an include of `from`.
    ///
    /// A failed optional include is logged and skipped; a failed required
    /// one is returned as `IncludeFailed`.
    pub fn include(&mut self, from: &Path, target: &Path, kind: IncludeKind) -> BuildResult<()> {
        self.builder.include(from, target, kind)
    }
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
