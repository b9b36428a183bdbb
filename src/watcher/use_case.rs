//! Watch loop

use std::collections::BTreeSet;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::builder::Builder;
use crate::error::{BuildError, BuildResult};
use crate::fs::FileSystem;
use crate::registry::Registry;

use super::cache::ContentHashes;
use super::event::{WatchEvent, WatchOptions, WatcherState};

/// `notify` replays events for existing files right after registration
const STARTUP_COOLDOWN_MS: u64 = 500;
const POLL_MS: u64 = 50;

/// A source change, read once its debounce window closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Modified { path: PathBuf, contents: Vec<u8> },
    Removed { path: PathBuf },
}

impl Change {
    /// Current state of `path` in `fs`
    pub fn read(fs: &dyn FileSystem, path: PathBuf) -> Self {
        match fs.read(&path) {
            Ok(contents) => Change::Modified { path, contents },
            Err(_) => Change::Removed { path },
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Change::Modified { path, .. } | Change::Removed { path } => path,
        }
    }
}

/// A required include whose file could not be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingInclude {
    /// Changed file whose rebuild failed; rebuilt again once `target` appears
    pub includer: PathBuf,
    pub target: PathBuf,
}

impl MissingInclude {
    pub fn from_error(err: &BuildError) -> Option<Self> {
        let BuildError::IncludeFailed { includer, .. } = err else {
            return None;
        };
        match err.root_cause() {
            BuildError::Read { path, .. } => Some(Self {
                includer: includer.clone(),
                target: path.clone(),
            }),
            _ => None,
        }
    }
}

/// Directories holding the entry and every present unit
pub fn watch_dirs(registry: &Registry, entry: &Path) -> BTreeSet<PathBuf> {
    registry
        .present_units()
        .map(|unit| unit.path())
        .chain(std::iter::once(entry))
        .filter_map(Path::parent)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .collect()
}

/// Continuous rebuilds of one entry
pub struct WatchUseCase {
    options: WatchOptions,
}

impl WatchUseCase {
    pub fn new(options: WatchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &WatchOptions {
        &self.options
    }

    /// Build once, then rebuild on every change until `running` is cleared.
    ///
    /// Build failures are reported as `WatchEvent::Error` and the loop keeps
    /// going; only a watcher that cannot be set up is an error.
    pub fn start<F>(
        &self,
        builder: &mut Builder,
        running: Arc<AtomicBool>,
        on_event: F,
    ) -> BuildResult<()>
    where
        F: Fn(WatchEvent),
    {
        on_event(WatchEvent::WatchStarted {
            entry: self.options.entry.display().to_string(),
            output: self.options.output.display().to_string(),
        });
        let mut missing = self
            .run_pass(builder, Vec::new(), &on_event)
            .err()
            .and_then(|err| MissingInclude::from_error(&err));

        let entry = builder.canonicalize(&self.options.entry);
        let (tx, rx) = channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    for path in event.paths {
                        let _ = tx.send(path);
                    }
                }
            },
            Config::default(),
        )
        .map_err(|e| BuildError::Io(std::io::Error::other(e.to_string())))?;

        let mut watched = BTreeSet::new();
        let wanted = wanted_dirs(builder, &entry, missing.as_ref());
        refresh_watches(&mut watcher, &mut watched, wanted);
        let mut hashes = ContentHashes::new();
        hashes.seed(
            builder.fs(),
            builder.registry().present_units().map(|unit| unit.path()),
        );
        let mut state = WatcherState::new();

        let cooldown_end = Instant::now() + Duration::from_millis(STARTUP_COOLDOWN_MS);
        while Instant::now() < cooldown_end {
            let _ = rx.recv_timeout(Duration::from_millis(POLL_MS));
        }

        while running.load(Ordering::SeqCst) {
            if let Ok(path) = rx.recv_timeout(Duration::from_millis(POLL_MS)) {
                let path = builder.canonicalize(&path);
                match &missing {
                    Some(include) if include.target == path => {
                        if builder.fs().exists(&path) {
                            state.add_change(include.includer.clone());
                        }
                    }
                    _ if path == entry || builder.registry().contains(&path) => {
                        let changed = match builder.fs().read(&path) {
                            Ok(content) => hashes.record(&path, &content),
                            Err(_) => hashes.forget(&path),
                        };
                        if changed {
                            state.add_change(path);
                        }
                    }
                    _ => {}
                }
            }

            if state.should_sync() {
                let changes: Vec<Change> = state
                    .take_changes()
                    .into_iter()
                    .map(|path| Change::read(builder.fs(), path))
                    .collect();
                for change in &changes {
                    on_event(WatchEvent::FileChanged {
                        path: change.path().display().to_string(),
                    });
                }
                missing = self
                    .run_pass(builder, changes, &on_event)
                    .err()
                    .and_then(|err| MissingInclude::from_error(&err));
                let wanted = wanted_dirs(builder, &entry, missing.as_ref());
                refresh_watches(&mut watcher, &mut watched, wanted);
                hashes.seed(
                    builder.fs(),
                    builder.registry().present_units().map(|unit| unit.path()),
                );
            }
        }

        on_event(WatchEvent::Shutdown);
        Ok(())
    }

    /// Apply `changes` with start/complete/error events
    pub fn run_pass(
        &self,
        builder: &mut Builder,
        changes: Vec<Change>,
        on_event: &impl Fn(WatchEvent),
    ) -> BuildResult<usize> {
        on_event(WatchEvent::BuildStarted);
        let result = self.apply(builder, changes);
        match &result {
            Ok(units) => on_event(WatchEvent::BuildComplete { units: *units }),
            Err(err) => on_event(WatchEvent::Error {
                message: describe(err),
            }),
        }
        result
    }

    /// Apply changes one at a time, then prune and rewrite the artifact.
    ///
    /// Every change is applied even if an earlier one fails; the artifact is
    /// only rewritten when all of them succeeded. While no entry is built
    /// (first pass, or after it failed or was deleted) the whole entry is
    /// built instead. Returns the number of units in the artifact.
    pub fn apply(&self, builder: &mut Builder, changes: Vec<Change>) -> BuildResult<usize> {
        if builder.registry().entry().is_none() {
            builder.build_entry(&self.options.entry, &self.options.output)?;
            return Ok(builder.registry().present_units().count());
        }

        let mut failure = None;
        for change in changes {
            let result = match &change {
                Change::Modified { path, contents } => {
                    builder.rebuild_file(path, Some(contents.clone()), true)
                }
                Change::Removed { path } => builder.remove_file(path),
            };
            if let Err(err) = result {
                debug!(path = %change.path().display(), "change failed: {}", err);
                if failure.is_none() {
                    failure = Some(err);
                }
            }
        }
        if let Some(err) = failure {
            return Err(err);
        }

        builder.rebuild_with_entry(&self.options.output)?;
        Ok(builder.registry().present_units().count())
    }
}

/// Watched directories, plus the one a missing include should appear in
fn wanted_dirs(
    builder: &Builder,
    entry: &Path,
    missing: Option<&MissingInclude>,
) -> BTreeSet<PathBuf> {
    let mut dirs = watch_dirs(builder.registry(), entry);
    if let Some(dir) = missing.and_then(|include| include.target.parent()) {
        dirs.insert(dir.to_path_buf());
    }
    dirs
}

fn refresh_watches(
    watcher: &mut RecommendedWatcher,
    watched: &mut BTreeSet<PathBuf>,
    wanted: BTreeSet<PathBuf>,
) {
    for dir in watched.difference(&wanted) {
        if let Err(err) = watcher.unwatch(dir) {
            debug!(dir = %dir.display(), "unwatch failed: {}", err);
        }
    }
    let mut now_watched: BTreeSet<PathBuf> = watched.intersection(&wanted).cloned().collect();
    for dir in wanted.difference(watched) {
        match watcher.watch(dir, RecursiveMode::NonRecursive) {
            Ok(()) => {
                now_watched.insert(dir.clone());
            }
            Err(err) => warn!("cannot watch {}: {}", dir.display(), err),
        }
    }
    *watched = now_watched;
}

/// Error message with its cause chain on one line
fn describe(err: &BuildError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
