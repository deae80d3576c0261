#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: BEGIN_REQUEST body decoding.
//
// Catches bugs in:
// - Bodies shorter than eight bytes
// - Role values outside the three defined roles
fuzz_target!(|data: &[u8]| {
    match fcgi_wire::read_begin_request_body(data) {
        Ok(body) => {
            assert!(data.len() >= 8);
            assert_eq!(body.role.wire_id(), u16::from_be_bytes([data[0], data[1]]));
        }
        Err(_) => assert!(data.len() < 8),
    }
});
