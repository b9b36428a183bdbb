//! Watch mode
//!
//! Keeps a `Builder` alive and rebuilds the bundle whenever one of the
//! registered sources changes:
//! - `event` - watch events (NDJSON) and debounce state
//! - `cache` - content hashes used to drop no-op change notifications
//! - `use_case` - the blocking watch loop

mod cache;
mod event;
mod use_case;

#[cfg(test)]
mod tests;

pub use cache::{compute_content_hash, ContentHashes};
pub use event::{WatchEvent, WatchOptions, WatcherState, DEBOUNCE_MS};
pub use use_case::{watch_dirs, Change, MissingInclude, WatchUseCase};
