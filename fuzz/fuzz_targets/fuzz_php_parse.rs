#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(src) = std::str::from_utf8(data) {
        // Lexing and parsing should never panic
        let _ = phpinclude::php::lexer::tokenize(src);
        let _ = phpinclude::php::parse(src);
    }
});
