#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: one- and four-byte length prefixes.
//
// Catches bugs in:
// - Zero-length input
// - Long form with fewer than four bytes left
// - Top bit not masked off the long form
fuzz_target!(|data: &[u8]| {
    if let Ok((value, next)) = fcgi_wire::read_variable_length(data, 0) {
        assert!(value <= 0x7FFF_FFFF);
        assert!(next == 1 || next == 4);
        assert!(next <= data.len());
    }
});
