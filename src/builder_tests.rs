use super::*;
use crate::events::tests::RecordingEventSink;
use crate::fs::MemoryFs;

const OUT: &str = "/dest/index.php";

fn setup(files: &[(&str, &str)]) -> (Builder, MemoryFs, RecordingEventSink) {
    let fs = MemoryFs::new();
    for (path, content) in files {
        fs.insert(path, *content);
    }
    let sink = RecordingEventSink::default();
    let builder = Builder::new(BuilderConfig::default())
        .unwrap()
        .with_fs(Arc::new(fs.clone()))
        .with_event_sink(Arc::new(sink.clone()));
    (builder, fs, sink)
}

fn present(builder: &Builder) -> Vec<String> {
    builder
        .registry()
        .present_units()
        .map(|u| u.path().display().to_string())
        .collect()
}

fn id(path: &str) -> ModuleId {
    ModuleId::from_path(Path::new(path), false)
}

#[test]
fn test_build_entry_registers_in_include_order() {
    let (mut builder, fs, _) = setup(&[
        ("/src/index.php", "<?php require 'a.php'; require 'b.php';"),
        ("/src/a.php", "<?php require 'c.php';"),
        ("/src/b.php", "<?php echo 'b';"),
        ("/src/c.php", "<?php echo 'c';"),
    ]);

    builder
        .build_entry(Path::new("/src/index.php"), Path::new(OUT))
        .unwrap();

    assert_eq!(
        present(&builder),
        vec!["/src/index.php", "/src/a.php", "/src/c.php", "/src/b.php"]
    );
    let bundle = fs.get(OUT).unwrap();
    assert!(bundle.starts_with("<?php\n"));
    assert!(bundle.ends_with(&format!(
        "\n__phpinclude_dispatch('{}', true, false);\n",
        id("/src/index.php")
    )));
}

#[test]
fn test_once_target_is_built_once() {
    let (mut builder, fs, sink) = setup(&[
        ("/src/index.php", "<?php require_once 'a.php'; require_once 'b.php';"),
        ("/src/a.php", "<?php require_once 'shared.php';"),
        ("/src/b.php", "<?php require_once __DIR__ . '/shared.php';"),
        ("/src/shared.php", "<?php function shared() {}"),
    ]);

    builder
        .build_entry(Path::new("/src/index.php"), Path::new(OUT))
        .unwrap();

    let built = sink
        .events()
        .iter()
        .filter(|e| matches!(e, BuildEvent::Built { path, .. } if path == Path::new("/src/shared.php")))
        .count();
    assert_eq!(built, 1);
    let bundle = fs.get(OUT).unwrap();
    let definition = format!("function {}()", id("/src/shared.php"));
    assert_eq!(bundle.matches(&definition).count(), 1);
    let shared = builder.registry().get(Path::new("/src/shared.php")).unwrap();
    assert_eq!(shared.included_by().count(), 2);
}

#[test]
fn test_missing_required_include_fails_without_writing() {
    let (mut builder, fs, _) = setup(&[("/src/index.php", "<?php require 'missing.php';")]);

    let err = builder
        .build_entry(Path::new("/src/index.php"), Path::new(OUT))
        .unwrap_err();

    assert!(matches!(err.root_cause(), BuildError::Read { .. }), "{:?}", err);
    assert!(fs.get(OUT).is_none());
}

#[test]
fn test_missing_optional_include_is_skipped() {
    let (mut builder, fs, _) = setup(&[("/src/index.php", "<?php include 'missing.php';")]);

    builder
        .build_entry(Path::new("/src/index.php"), Path::new(OUT))
        .unwrap();

    assert_eq!(present(&builder), vec!["/src/index.php"]);
    let bundle = fs.get(OUT).unwrap();
    assert!(bundle.contains(&format!(
        "__phpinclude_dispatch('{}', false, false);",
        id("/src/missing.php")
    )));
}

#[test]
fn test_failed_optional_include_is_discarded() {
    let (mut builder, _, _) = setup(&[
        ("/src/index.php", "<?php include 'broken.php';"),
        ("/src/broken.php", "<?php $x = ;"),
    ]);

    builder
        .build_entry(Path::new("/src/index.php"), Path::new(OUT))
        .unwrap();

    assert!(!builder.registry().contains(Path::new("/src/broken.php")));
}

#[test]
fn test_unsupported_required_file_type() {
    let (mut builder, _, _) = setup(&[
        ("/src/index.php", "<?php require 'style.css';"),
        ("/src/style.css", "body {}"),
    ]);

    let err = builder
        .build_entry(Path::new("/src/index.php"), Path::new(OUT))
        .unwrap_err();

    assert!(matches!(
        err.root_cause(),
        BuildError::UnsupportedFileType { .. }
    ));
}

#[test]
fn test_once_cycle_terminates() {
    let (mut builder, _, _) = setup(&[
        ("/src/a.php", "<?php require_once 'b.php'; echo 'a';"),
        ("/src/b.php", "<?php require_once 'a.php'; echo 'b';"),
    ]);

    builder
        .build_entry(Path::new("/src/a.php"), Path::new(OUT))
        .unwrap();

    assert_eq!(present(&builder), vec!["/src/a.php", "/src/b.php"]);
    let a = builder.registry().get(Path::new("/src/a.php")).unwrap();
    assert_eq!(a.included_by().collect::<Vec<_>>(), vec![Path::new("/src/b.php")]);
}

#[test]
fn test_cycle_without_once_is_an_error() {
    let (mut builder, _, _) = setup(&[
        ("/src/a.php", "<?php require 'b.php';"),
        ("/src/b.php", "<?php include 'a.php';"),
    ]);

    let err = builder
        .build_entry(Path::new("/src/a.php"), Path::new(OUT))
        .unwrap_err();

    let BuildError::CyclicInclude { chain } = err.root_cause() else {
        panic!("expected cycle, got {:?}", err);
    };
    assert_eq!(
        chain,
        &vec![
            PathBuf::from("/src/a.php"),
            PathBuf::from("/src/b.php"),
            PathBuf::from("/src/a.php")
        ]
    );
}

#[test]
fn test_rebuild_drops_abandoned_subtree() {
    let (mut builder, fs, sink) = setup(&[
        ("/src/a.php", "<?php require 'b.php';"),
        ("/src/b.php", "<?php require 'c.php';"),
        ("/src/c.php", "<?php echo 'c';"),
    ]);
    builder
        .build_entry(Path::new("/src/a.php"), Path::new(OUT))
        .unwrap();

    fs.insert("/src/b.php", "<?php echo 'b';");
    builder
        .rebuild_file(Path::new("/src/b.php"), None, true)
        .unwrap();
    builder.rebuild_with_entry(Path::new(OUT)).unwrap();

    assert_eq!(present(&builder), vec!["/src/a.php", "/src/b.php"]);
    assert!(!builder.registry().contains(Path::new("/src/c.php")));
    assert!(!fs.get(OUT).unwrap().contains(id("/src/c.php").as_str()));
    assert!(sink
        .events()
        .contains(&BuildEvent::Pruned {
            path: PathBuf::from("/src/c.php")
        }));
}

#[test]
fn test_rebuild_reuses_cached_subtree() {
    let (mut builder, fs, sink) = setup(&[
        ("/src/a.php", "<?php require 'b.php';"),
        ("/src/b.php", "<?php require 'c.php';"),
        ("/src/c.php", "<?php require 'd.php';"),
        ("/src/d.php", "<?php echo 'd';"),
    ]);
    builder
        .build_entry(Path::new("/src/a.php"), Path::new(OUT))
        .unwrap();
    let before = sink.events().len();

    fs.insert("/src/b.php", "<?php echo 'b'; require 'c.php';");
    builder
        .rebuild_file(Path::new("/src/b.php"), None, true)
        .unwrap();
    builder.rebuild_with_entry(Path::new(OUT)).unwrap();

    assert_eq!(present(&builder).len(), 4);
    let rebuilt: Vec<_> = sink.events()[before..]
        .iter()
        .filter_map(|e| match e {
            BuildEvent::Built { path, .. } => Some(path.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(rebuilt, vec![PathBuf::from("/src/b.php")]);
}

#[test]
fn test_failed_rebuild_keeps_previous_graph() {
    let (mut builder, fs, _) = setup(&[
        ("/src/a.php", "<?php require 'b.php';"),
        ("/src/b.php", "<?php require 'c.php';"),
        ("/src/c.php", "<?php echo 'c';"),
    ]);
    builder
        .build_entry(Path::new("/src/a.php"), Path::new(OUT))
        .unwrap();

    fs.insert("/src/b.php", "<?php require 'c.php'");
    assert!(builder
        .rebuild_file(Path::new("/src/b.php"), None, true)
        .is_err());

    assert_eq!(present(&builder).len(), 3);
}

#[test]
fn test_failed_include_after_register_restores_unit() {
    let (mut builder, fs, _) = setup(&[
        ("/src/a.php", "<?php require 'b.php';"),
        ("/src/b.php", "<?php require 'c.php'; require 'd.php';"),
        ("/src/c.php", "<?php echo 'c';"),
        ("/src/d.php", "<?php echo 'd';"),
    ]);
    builder
        .build_entry(Path::new("/src/a.php"), Path::new(OUT))
        .unwrap();
    let b = Path::new("/src/b.php");
    let body = builder.registry().get(b).unwrap().body().to_string();

    fs.insert(b, "<?php require 'c.php'; require 'missing.php';");
    let err = builder.rebuild_file(b, None, true).unwrap_err();
    assert!(matches!(err.root_cause(), BuildError::Read { .. }));

    let unit = builder.registry().get(b).unwrap();
    assert_eq!(unit.body(), body);
    assert_eq!(
        unit.includes().collect::<Vec<_>>(),
        vec![Path::new("/src/c.php"), Path::new("/src/d.php")]
    );

    builder.rebuild_with_entry(Path::new(OUT)).unwrap();
    assert_eq!(
        present(&builder),
        vec!["/src/a.php", "/src/b.php", "/src/c.php", "/src/d.php"]
    );
    let bundle = fs.get(OUT).unwrap();
    assert!(bundle.contains("echo 'd';"));
    assert!(!bundle.contains(id("/src/missing.php").as_str()));
}

#[test]
fn test_rebuild_closing_plain_cycle_is_an_error() {
    let (mut builder, fs, _) = setup(&[
        ("/src/a.php", "<?php require 'b.php';"),
        ("/src/b.php", "<?php echo 'b';"),
    ]);
    builder
        .build_entry(Path::new("/src/a.php"), Path::new(OUT))
        .unwrap();
    let before = fs.get(OUT).unwrap();

    fs.insert("/src/b.php", "<?php require 'a.php';");
    let err = builder
        .rebuild_file(Path::new("/src/b.php"), None, true)
        .unwrap_err();

    let BuildError::CyclicInclude { chain } = err.root_cause() else {
        panic!("expected cycle, got {:?}", err);
    };
    assert_eq!(
        chain,
        &vec![
            PathBuf::from("/src/a.php"),
            PathBuf::from("/src/b.php"),
            PathBuf::from("/src/a.php")
        ]
    );
    builder.rebuild_with_entry(Path::new(OUT)).unwrap();
    assert_eq!(fs.get(OUT).unwrap(), before);
}

#[test]
fn test_rebuild_closing_once_cycle_is_accepted() {
    let (mut builder, fs, _) = setup(&[
        ("/src/a.php", "<?php require 'b.php';"),
        ("/src/b.php", "<?php echo 'b';"),
    ]);
    builder
        .build_entry(Path::new("/src/a.php"), Path::new(OUT))
        .unwrap();

    fs.insert("/src/b.php", "<?php require_once 'a.php';");
    builder
        .rebuild_file(Path::new("/src/b.php"), None, true)
        .unwrap();
    builder.rebuild_with_entry(Path::new(OUT)).unwrap();

    let a = builder.registry().get(Path::new("/src/a.php")).unwrap();
    assert_eq!(a.included_by().collect::<Vec<_>>(), vec![Path::new("/src/b.php")]);
}

#[test]
fn test_remove_file_rebuilds_includers() {
    let (mut builder, fs, _) = setup(&[
        ("/src/a.php", "<?php include 'b.php'; echo 'a';"),
        ("/src/b.php", "<?php echo 'b';"),
    ]);
    builder
        .build_entry(Path::new("/src/a.php"), Path::new(OUT))
        .unwrap();

    fs.remove("/src/b.php");
    builder.remove_file(Path::new("/src/b.php")).unwrap();
    builder.rebuild_with_entry(Path::new(OUT)).unwrap();

    assert_eq!(present(&builder), vec!["/src/a.php"]);
}

#[test]
fn test_build_file_with_loader_override() {
    let (mut builder, _, _) = setup(&[("/src/notes.php", "<?php not php at all")]);
    let plain = builder.loaders().by_name("plaintext").unwrap();

    builder
        .build_file_with_loader(Path::new("/src/notes.php"), None, true, plain)
        .unwrap();

    let unit = builder.registry().get(Path::new("/src/notes.php")).unwrap();
    assert!(unit.body().contains("return '<?php not php at all';"));
}

#[test]
fn test_build_file_with_supplied_contents() {
    let (mut builder, _, _) = setup(&[]);

    builder
        .build_file(
            Path::new("/src/virtual.php"),
            Some(b"<?php echo 1;".to_vec()),
            true,
        )
        .unwrap();

    assert!(builder.registry().contains(Path::new("/src/virtual.php")));
}

#[test]
fn test_unreadable_optional_file_is_a_no_op() {
    let (mut builder, _, _) = setup(&[]);

    builder
        .build_file(Path::new("/src/missing.php"), None, false)
        .unwrap();

    assert!(builder.registry().is_empty());
}

#[test]
fn test_build_file_if_not_cached_skips_known_units() {
    let (mut builder, fs, sink) = setup(&[("/src/a.php", "<?php echo 1;")]);
    builder
        .build_file_if_not_cached(Path::new("/src/a.php"), true)
        .unwrap();
    fs.insert("/src/a.php", "<?php echo 2;");

    builder
        .build_file_if_not_cached(Path::new("/src/a.php"), true)
        .unwrap();

    let unit = builder.registry().get(Path::new("/src/a.php")).unwrap();
    assert!(unit.body().contains("echo 1;"));
    let added = sink
        .events()
        .iter()
        .filter(|e| matches!(e, BuildEvent::FileAdded { .. }))
        .count();
    assert_eq!(added, 1);
}

#[test]
fn test_events_for_entry_build() {
    let (mut builder, _, sink) = setup(&[
        ("/src/index.php", "<?php $msg = require 'msg.txt';"),
        ("/src/msg.txt", "hello"),
    ]);

    builder
        .build_entry(Path::new("/src/index.php"), Path::new(OUT))
        .unwrap();

    let events = sink.events();
    assert!(matches!(&events[0], BuildEvent::FileAdded { path, .. } if path == Path::new("/src/msg.txt")));
    assert_eq!(
        events.last(),
        Some(&BuildEvent::EntryBuilt {
            entry: PathBuf::from("/src/index.php"),
            output: PathBuf::from(OUT),
            units: 2,
        })
    );
}

#[test]
fn test_rebuild_with_entry_before_build_fails() {
    let (mut builder, _, _) = setup(&[]);
    assert!(matches!(
        builder.rebuild_with_entry(Path::new(OUT)),
        Err(BuildError::EntryNotBuilt { .. })
    ));
}
