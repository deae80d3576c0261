#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: record header framing.
//
// Catches bugs in:
// - Short buffers (must be InsufficientData, never a partial header)
// - Big-endian decoding of request id and content length
// - Unknown record type ids
fuzz_target!(|data: &[u8]| {
    match fcgi_wire::read_record(data) {
        Ok(header) => {
            assert!(data.len() >= fcgi_wire::HEADER_SIZE);
            assert_eq!(header.record_type.wire_id(), data[1]);
            assert_eq!(header.request_id, u16::from_be_bytes([data[2], data[3]]));
        }
        Err(e) => assert!(e.is_insufficient_data() && data.len() < fcgi_wire::HEADER_SIZE),
    }
});
