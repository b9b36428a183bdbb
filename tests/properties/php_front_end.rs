//! The lexer, parser and transformer must reject bad input with an error,
//! never a panic.

use std::path::Path;

use proptest::prelude::*;

use phpinclude::loaders::php::transform;
use phpinclude::php::{lexer, parse};
use phpinclude::MemoryFs;

/// Fragments that steer generated text into interesting lexer states
fn php_fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("<?php ".to_string()),
        Just("?>".to_string()),
        Just("<?= ".to_string()),
        Just("$x".to_string()),
        Just("'str".to_string()),
        Just("\"a $b {$c[1]} ${d}\"".to_string()),
        Just("<<<EOT\nbody\nEOT;\n".to_string()),
        Just("<<<'N'\n  raw\n  N\n".to_string()),
        Just("/* c".to_string()),
        Just("#[Attr] ".to_string()),
        Just("include 'a.php';".to_string()),
        Just("require_once __DIR__ . '/b.php';".to_string()),
        Just("function f($a = 1) { return $a; }".to_string()),
        Just("fn($x) => $x * 2;".to_string()),
        Just("match ($v) { 1 => 'a', default => 'b' };".to_string()),
        Just("if ($a): echo 1; endif;".to_string()),
        Just("(".to_string()),
        Just("}".to_string()),
        Just("0x1F_FF 1e-3 0b101 ".to_string()),
        "[ -~\\n]{0,12}",
    ]
}

fn php_source() -> impl Strategy<Value = String> {
    proptest::collection::vec(php_fragment(), 0..12).prop_map(|parts| parts.concat())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: tokenizing arbitrary text never panics.
    #[test]
    fn property_lexer_never_panics(src in "(?s).{0,256}") {
        let _ = lexer::tokenize(&src);
    }

    /// PROPERTY: parsing arbitrary text never panics.
    #[test]
    fn property_parser_never_panics(src in "(?s).{0,256}") {
        let _ = parse(&src);
    }

    /// PROPERTY: PHP-shaped input never panics the parser or transformer.
    #[test]
    fn property_transform_never_panics(src in php_source()) {
        let _ = parse(&src);
        let _ = transform(&src, Path::new("/app/index.php"), &MemoryFs::new(), false);
    }

    /// PROPERTY: transforming is deterministic.
    #[test]
    fn property_transform_is_deterministic(src in php_source()) {
        let fs = MemoryFs::new();
        let first = transform(&src, Path::new("/app/index.php"), &fs, false);
        let second = transform(&src, Path::new("/app/index.php"), &fs, false);
        match (first, second) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(a.body, b.body);
                prop_assert_eq!(a.includes, b.includes);
            }
            (Err(a), Err(b)) => prop_assert_eq!(a.to_string(), b.to_string()),
            _ => prop_assert!(false, "transform result changed between runs"),
        }
    }
}
