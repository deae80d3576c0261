#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    chunk: u8,
    data: Vec<u8>,
}

// Fuzz target: chunked framing.
//
// Feeding the record buffer in arbitrary chunks must frame exactly the
// records a single extend does.
fuzz_target!(|input: Input| {
    let chunk = usize::from(input.chunk.max(1));

    let mut whole = fcgi_decoder::RecordBuffer::new();
    whole.extend(&input.data);
    let mut expected = Vec::new();
    while let Ok(Some(record)) = whole.next_record() {
        expected.push(record);
    }

    let mut chunked = fcgi_decoder::RecordBuffer::new();
    let mut actual = Vec::new();
    'feed: for piece in input.data.chunks(chunk) {
        chunked.extend(piece);
        loop {
            match chunked.next_record() {
                Ok(Some(record)) => actual.push(record),
                Ok(None) => break,
                Err(_) => break 'feed,
            }
        }
    }

    assert_eq!(actual, expected);
});
