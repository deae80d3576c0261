#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: full in-memory decode.
//
// Any byte sequence must decode or fail with an error; the router must
// never panic on out-of-order or contradictory records.
fuzz_target!(|data: &[u8]| {
    let _ = fcgi_decoder::FcgiDecoder::decode(data);
});
