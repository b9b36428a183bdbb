//! Tests for the config module

use super::*;
use crate::error::BuildError;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn file() -> &'static Path {
    Path::new("phpinclude.toml")
}

#[test]
fn test_config_default_is_empty() {
    let config = parse("", file()).unwrap();
    assert_eq!(config, ConfigFile::default());

    let builder = config.into_builder_config(file(), false).unwrap();
    assert!(builder.loaders.is_empty());
    assert!(builder.extensions.is_empty());
    assert!(!builder.diagnostics);
}

#[test]
fn test_config_parse_toml() {
    let toml = r#"
[extensions]
".inc" = "php"
js = false

[[loaders]]
name = "esbuild"
extensions = ["ts", "tsx"]
command = ["esbuild", "{file}", "--bundle"]
"#;

    let config = parse(toml, file()).unwrap();

    assert_eq!(
        config.extensions.get(".inc"),
        Some(&ExtensionTarget::Loader("php".to_string()))
    );
    assert_eq!(
        config.extensions.get("js"),
        Some(&ExtensionTarget::Enabled(false))
    );
    assert_eq!(config.loaders.len(), 1);
    assert_eq!(config.loaders[0].extensions, vec!["ts", "tsx"]);

    let builder = config.into_builder_config(file(), true).unwrap();
    assert_eq!(builder.loaders[0].name(), "esbuild");
    assert_eq!(builder.extensions.get("inc"), Some(&Some("php".to_string())));
    assert_eq!(builder.extensions.get("js"), Some(&None));
    assert!(builder.diagnostics);
}

#[test]
fn test_unknown_keys_are_rejected_with_suggestion() {
    let toml = r#"
lodaers = []

[[loaders]]
name = "x"
comand = ["cat"]
command = ["cat"]
"#;

    let err = parse(toml, file()).unwrap_err();
    let BuildError::UnknownConfigKeys { keys, .. } = err else {
        panic!("expected unknown keys, got {:?}", err);
    };
    assert_eq!(keys.len(), 2);
    assert!(keys
        .iter()
        .any(|k| k == "lodaers (did you mean `loaders`?)"), "{:?}", keys);
    assert!(keys.iter().any(|k| k.ends_with("comand (did you mean `command`?)")), "{:?}", keys);
}

#[test]
fn test_invalid_shape_is_an_error() {
    let err = parse("extensions = 3", file()).unwrap_err();
    assert!(matches!(err, BuildError::InvalidConfig { .. }));

    let err = parse("[[loaders]]\nname = \"x\"\n", file()).unwrap_err();
    assert!(err.to_string().contains("command"), "{}", err);
}

#[test]
fn test_extension_mapped_to_true_is_invalid() {
    let config = parse("[extensions]\nphp = true\n", file()).unwrap();
    let err = config.into_builder_config(file(), false).unwrap_err();
    assert!(matches!(err, BuildError::InvalidConfig { .. }));
}

#[test]
fn test_loader_needs_name_and_command() {
    let config = parse("[[loaders]]\nname = \" \"\ncommand = [\"cat\"]\n", file()).unwrap();
    assert!(config.into_builder_config(file(), false).is_err());

    let config = parse("[[loaders]]\nname = \"cat\"\ncommand = []\n", file()).unwrap();
    let err = config.into_builder_config(file(), false).unwrap_err();
    assert!(err.to_string().contains("non-empty command"), "{}", err);
}

#[test]
fn test_discover_prefers_explicit_path() {
    let dir = tempdir().unwrap();
    assert_eq!(discover(None, dir.path()), None);

    fs::write(dir.path().join(CONFIG_FILE), "").unwrap();
    assert_eq!(
        discover(None, dir.path()),
        Some(dir.path().join(CONFIG_FILE))
    );

    let explicit = dir.path().join("other.toml");
    assert_eq!(discover(Some(&explicit), dir.path()), Some(explicit));
}

#[test]
fn test_load_builder_config_from_disk() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join(CONFIG_FILE),
        "[extensions]\ninc = \"php\"\n",
    )
    .unwrap();

    let config = load_builder_config(None, dir.path(), false).unwrap();
    assert_eq!(config.extensions.get("inc"), Some(&Some("php".to_string())));
}

#[test]
fn test_load_missing_explicit_file_fails() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.toml");
    let err = load_builder_config(Some(&missing), dir.path(), false).unwrap_err();
    assert!(matches!(err, BuildError::Read { .. }));
}
