//! Module ids are stable, valid PHP function names.

use std::path::PathBuf;

use proptest::prelude::*;

use phpinclude::ModuleId;

fn source_path() -> impl Strategy<Value = PathBuf> {
    let segment = proptest::string::string_regex("[A-Za-z0-9._ -]{1,16}").unwrap();
    proptest::collection::vec(segment, 1..=5)
        .prop_map(|segments| PathBuf::from(format!("/{}", segments.join("/"))))
}

fn is_php_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: the same path always maps to the same id.
    #[test]
    fn property_id_is_deterministic(path in source_path(), diagnostics in any::<bool>()) {
        prop_assert_eq!(
            ModuleId::from_path(&path, diagnostics),
            ModuleId::from_path(&path, diagnostics)
        );
    }

    /// PROPERTY: ids are identifiers with the module prefix.
    #[test]
    fn property_id_is_php_identifier(path in source_path(), diagnostics in any::<bool>()) {
        let id = ModuleId::from_path(&path, diagnostics);
        prop_assert!(id.as_str().starts_with(ModuleId::PREFIX));
        prop_assert!(is_php_identifier(id.as_str()), "{}", id);
    }

    /// PROPERTY: diagnostics only append a suffix to the production id.
    #[test]
    fn property_diagnostics_extend_production_id(path in source_path()) {
        let plain = ModuleId::from_path(&path, false);
        let dev = ModuleId::from_path(&path, true);
        prop_assert!(dev.as_str().starts_with(plain.as_str()));
    }

    /// PROPERTY: distinct paths get distinct ids.
    #[test]
    fn property_distinct_paths_distinct_ids(a in source_path(), b in source_path()) {
        prop_assume!(a != b);
        prop_assert_ne!(ModuleId::from_path(&a, false), ModuleId::from_path(&b, false));
    }
}
