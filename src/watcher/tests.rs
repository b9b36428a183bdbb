//! Tests for the watch module

use super::*;
use crate::builder::Builder;
use crate::config::BuilderConfig;
use crate::error::BuildError;
use crate::fs::MemoryFs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

const OUT: &str = "/dest/index.php";

fn memory_builder(files: &[(&str, &str)]) -> (Builder, MemoryFs) {
    let fs = MemoryFs::new();
    for (path, content) in files {
        fs.insert(path, *content);
    }
    let builder = Builder::new(BuilderConfig::default())
        .unwrap()
        .with_fs(Arc::new(fs.clone()));
    (builder, fs)
}

fn recorder() -> (Arc<Mutex<Vec<WatchEvent>>>, impl Fn(WatchEvent)) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    (events, move |event: WatchEvent| sink.lock().unwrap().push(event))
}

// === WatchEvent tests ===

#[test]
fn test_watch_event_to_json_started() {
    let event = WatchEvent::WatchStarted {
        entry: "src/index.php".to_string(),
        output: "dest/index.php".to_string(),
    };
    let json = event.to_json();
    assert!(json.contains("\"event\":\"watch_started\""));
    assert!(json.contains("\"entry\":\"src/index.php\""));
    assert!(json.contains("\"output\":\"dest/index.php\""));
}

#[test]
fn test_watch_event_to_json_build_complete() {
    let json = WatchEvent::BuildComplete { units: 4 }.to_json();
    assert_eq!(json, "{\"event\":\"build_complete\",\"units\":4}");
}

#[test]
fn test_watch_event_to_json_unit_variants() {
    assert_eq!(WatchEvent::BuildStarted.to_json(), "{\"event\":\"build_started\"}");
    assert_eq!(WatchEvent::Shutdown.to_json(), "{\"event\":\"shutdown\"}");
}

#[test]
fn test_watch_event_to_json_error() {
    let event = WatchEvent::Error {
        message: "Something \"failed\"".to_string(),
    };
    let json = event.to_json();
    assert!(json.contains("\"event\":\"error\""));
    assert!(json.contains("\\\"failed\\\""));
}

// === WatcherState tests ===

#[test]
fn test_watcher_state_debouncing() {
    let mut state = WatcherState::new();
    assert!(!state.should_sync());

    state.add_change(PathBuf::from("a.php"));
    assert!(state.has_pending());
    assert!(!state.should_sync());

    std::thread::sleep(Duration::from_millis(DEBOUNCE_MS + 10));
    assert!(state.should_sync());

    assert_eq!(state.take_changes().len(), 1);
    assert!(!state.should_sync());
    assert!(!state.has_pending());
}

#[test]
fn test_watcher_state_coalesces_in_path_order() {
    let mut state = WatcherState::new();
    state.add_change(PathBuf::from("c.php"));
    state.add_change(PathBuf::from("a.php"));
    state.add_change(PathBuf::from("c.php"));

    assert_eq!(
        state.take_changes(),
        vec![PathBuf::from("a.php"), PathBuf::from("c.php")]
    );
}

// === ContentHashes tests ===

#[test]
fn test_compute_content_hash() {
    assert_eq!(
        compute_content_hash(b""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
    assert_eq!(compute_content_hash(b"a"), compute_content_hash(b"a"));
    assert_ne!(compute_content_hash(b"a"), compute_content_hash(b"b"));
}

#[test]
fn test_content_hashes_skip_identical_writes() {
    let mut hashes = ContentHashes::new();
    let path = Path::new("/src/a.php");

    assert!(hashes.record(path, b"<?php echo 1;"));
    assert!(!hashes.record(path, b"<?php echo 1;"));
    assert!(hashes.record(path, b"<?php echo 2;"));

    assert!(hashes.forget(path));
    assert!(!hashes.forget(path));
    assert!(hashes.is_empty());
}

#[test]
fn test_content_hashes_seed_reads_each_file_once() {
    let fs = MemoryFs::new();
    fs.insert("/src/a.php", "<?php echo 1;");
    let file = Path::new("/src/a.php");

    let mut hashes = ContentHashes::new();
    hashes.seed(&fs, [file, Path::new("/src/missing.php")]);

    assert_eq!(hashes.len(), 1);
    assert!(!hashes.record(file, b"<?php echo 1;"));
}

// === WatchUseCase tests ===

#[test]
fn test_watch_dirs_cover_units_and_entry() {
    let (mut builder, _) = memory_builder(&[
        ("/src/index.php", "<?php require 'lib/a.php';"),
        ("/src/lib/a.php", "<?php echo 'a';"),
    ]);
    builder
        .build_entry(Path::new("/src/index.php"), Path::new(OUT))
        .unwrap();

    let dirs = watch_dirs(builder.registry(), Path::new("/src/index.php"));
    assert_eq!(
        dirs.into_iter().collect::<Vec<_>>(),
        vec![PathBuf::from("/src"), PathBuf::from("/src/lib")]
    );
}

#[test]
fn test_first_pass_builds_entry() {
    let (mut builder, fs) = memory_builder(&[
        ("/src/index.php", "<?php require 'a.php';"),
        ("/src/a.php", "<?php echo 'a';"),
    ]);
    let use_case = WatchUseCase::new(WatchOptions::new("/src/index.php", OUT));
    let (events, on_event) = recorder();

    assert_eq!(use_case.run_pass(&mut builder, Vec::new(), &on_event).unwrap(), 2);

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            WatchEvent::BuildStarted,
            WatchEvent::BuildComplete { units: 2 }
        ]
    );
    assert!(fs.get(OUT).is_some());
}

#[test]
fn test_pass_applies_modified_and_removed_files() {
    let (mut builder, fs) = memory_builder(&[
        ("/src/index.php", "<?php include 'a.php'; include 'b.php';"),
        ("/src/a.php", "<?php echo 'a';"),
        ("/src/b.php", "<?php echo 'b';"),
    ]);
    let use_case = WatchUseCase::new(WatchOptions::new("/src/index.php", OUT));
    use_case.apply(&mut builder, Vec::new()).unwrap();

    fs.remove("/src/b.php");
    let units = use_case
        .apply(
            &mut builder,
            vec![
                Change::Modified {
                    path: PathBuf::from("/src/a.php"),
                    contents: b"<?php echo 'changed';".to_vec(),
                },
                Change::Removed {
                    path: PathBuf::from("/src/b.php"),
                },
            ],
        )
        .unwrap();

    assert_eq!(units, 2);
    let bundle = fs.get(OUT).unwrap();
    assert!(bundle.contains("echo 'changed';"));
    assert!(!builder.registry().contains(Path::new("/src/b.php")));
}

#[test]
fn test_failed_pass_reports_error_and_keeps_artifact() {
    let (mut builder, fs) = memory_builder(&[
        ("/src/index.php", "<?php require 'a.php';"),
        ("/src/a.php", "<?php echo 'a';"),
    ]);
    let use_case = WatchUseCase::new(WatchOptions::new("/src/index.php", OUT));
    use_case.apply(&mut builder, Vec::new()).unwrap();
    let before = fs.get(OUT).unwrap();
    let (events, on_event) = recorder();

    let result = use_case.run_pass(
        &mut builder,
        vec![Change::Modified {
            path: PathBuf::from("/src/a.php"),
            contents: b"<?php $x = ;".to_vec(),
        }],
        &on_event,
    );

    assert!(result.is_err());
    let events = events.lock().unwrap();
    assert!(
        matches!(&events[1], WatchEvent::Error { message } if message.contains("/src/a.php")),
        "{:?}",
        events
    );
    assert_eq!(fs.get(OUT).unwrap(), before);
}

#[test]
fn test_pass_after_failed_entry_retries_full_build() {
    let (mut builder, fs) = memory_builder(&[("/src/index.php", "<?php require 'a.php';")]);
    let use_case = WatchUseCase::new(WatchOptions::new("/src/index.php", OUT));
    assert!(use_case.apply(&mut builder, Vec::new()).is_err());

    fs.insert("/src/a.php", "<?php echo 'a';");
    let units = use_case
        .apply(
            &mut builder,
            vec![Change::Modified {
                path: PathBuf::from("/src/a.php"),
                contents: b"<?php echo 'a';".to_vec(),
            }],
        )
        .unwrap();

    assert_eq!(units, 2);
}

#[test]
fn test_change_reads_through_file_system() {
    let fs = MemoryFs::new();
    fs.insert("/src/a.php", "<?php echo 'a';");

    assert_eq!(
        Change::read(&fs, PathBuf::from("/src/a.php")),
        Change::Modified {
            path: PathBuf::from("/src/a.php"),
            contents: b"<?php echo 'a';".to_vec(),
        }
    );
    assert_eq!(
        Change::read(&fs, PathBuf::from("/src/gone.php")),
        Change::Removed {
            path: PathBuf::from("/src/gone.php"),
        }
    );
}

#[test]
fn test_creating_missing_include_rebuilds_includer() {
    let (mut builder, fs) = memory_builder(&[
        ("/src/index.php", "<?php require 'a.php';"),
        ("/src/a.php", "<?php echo 'a';"),
    ]);
    let use_case = WatchUseCase::new(WatchOptions::new("/src/index.php", OUT));
    let (_, on_event) = recorder();
    use_case.run_pass(&mut builder, Vec::new(), &on_event).unwrap();

    fs.insert("/src/a.php", "<?php require 'lib/b.php';");
    let change = Change::read(builder.fs(), PathBuf::from("/src/a.php"));
    let err = use_case
        .run_pass(&mut builder, vec![change], &on_event)
        .unwrap_err();

    let missing = MissingInclude::from_error(&err).unwrap();
    assert_eq!(
        missing,
        MissingInclude {
            includer: PathBuf::from("/src/a.php"),
            target: PathBuf::from("/src/lib/b.php"),
        }
    );

    fs.insert("/src/lib/b.php", "<?php echo 'b';");
    let change = Change::read(builder.fs(), missing.includer);
    let units = use_case
        .run_pass(&mut builder, vec![change], &on_event)
        .unwrap();

    assert_eq!(units, 3);
    assert!(fs.get(OUT).unwrap().contains("echo 'b';"));
}

#[test]
fn test_missing_include_ignores_other_failures() {
    let err = BuildError::IncludeFailed {
        includer: PathBuf::from("/src/a.php"),
        target: PathBuf::from("/src/b.php"),
        source: Box::new(BuildError::Parse {
            path: PathBuf::from("/src/b.php"),
            line: 1,
            column: 7,
            message: "unexpected `;`".to_string(),
        }),
    };
    assert_eq!(MissingInclude::from_error(&err), None);
}

#[test]
fn test_watch_stops_when_not_running() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(src.join("index.php"), "<?php require 'a.php';").unwrap();
    std::fs::write(src.join("a.php"), "<?php echo 'a';").unwrap();
    let output = dir.path().join("dest").join("index.php");

    let mut builder = Builder::new(BuilderConfig::default()).unwrap();
    let use_case = WatchUseCase::new(WatchOptions::new(src.join("index.php"), output.clone()));
    let (events, on_event) = recorder();
    let running = Arc::new(AtomicBool::new(false));

    use_case.start(&mut builder, running, on_event).unwrap();

    let events = events.lock().unwrap();
    assert!(matches!(events[0], WatchEvent::WatchStarted { .. }));
    assert!(events.contains(&WatchEvent::BuildComplete { units: 2 }));
    assert_eq!(events.last(), Some(&WatchEvent::Shutdown));
    assert!(output.exists());
}
