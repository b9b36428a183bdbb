//! Build event port
//!
//! The builder reports what it did through a `BuildEventSink`. The CLI and
//! the watch loop subscribe; embedders that don't care use `NoopEventSink`.

use std::path::PathBuf;

use crate::module_id::ModuleId;

/// Event emitted while building
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    /// A file was processed (first time or rebuilt)
    Built { path: PathBuf, module_id: ModuleId },

    /// A file entered the registry for the first time
    FileAdded { path: PathBuf, module_id: ModuleId },

    /// A unit nothing includes anymore was dropped
    Pruned { path: PathBuf },

    /// The artifact was written
    EntryBuilt {
        entry: PathBuf,
        output: PathBuf,
        units: usize,
    },
}

/// Trait for receiving build events
pub trait BuildEventSink: Send + Sync {
    /// Handle a build event
    fn on_event(&self, event: BuildEvent);
}

/// No-op event sink for silent operation
pub struct NoopEventSink;

impl BuildEventSink for NoopEventSink {
    fn on_event(&self, _event: BuildEvent) {}
}
