#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use phpinclude::loaders::php::transform;
use phpinclude::MemoryFs;

fuzz_target!(|data: &[u8]| {
    if let Ok(src) = std::str::from_utf8(data) {
        let fs = MemoryFs::new();
        let _ = transform(src, Path::new("/app/index.php"), &fs, false);
        let _ = transform(src, Path::new("/app/index.php"), &fs, true);
    }
});
