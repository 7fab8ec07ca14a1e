#![no_main]

use libfuzzer_sys::fuzz_target;
use nodeinv::nodelist::{compress, expand};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Anything that expands must compress back to the same node set
        if let Ok(nodes) = expand(input) {
            if let Ok(compressed) = compress(&nodes) {
                let mut again = expand(&compressed).expect("compressed output expands");
                let mut original = nodes;
                original.sort();
                original.dedup();
                again.sort();
                assert_eq!(original, again);
            }
        }
    }
});
