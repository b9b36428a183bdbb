#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        // Config parsing and validation should never panic
        let file = Path::new("phpinclude.toml");
        if let Ok(config) = phpinclude::config::parse(content, file) {
            let _ = config.into_builder_config(file, false);
        }
    }
});
