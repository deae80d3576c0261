#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: parameter block decoding.
//
// Catches bugs in:
// - Length prefixes that overflow the block (or usize)
// - Trailing bytes that do not form a pair
// - Disagreement between the iterator and the map builder
fuzz_target!(|data: &[u8]| {
    let map = fcgi_wire::read_all_name_value_pairs(data);
    let pairs: Result<Vec<_>, _> = fcgi_wire::NameValuePairs::new(data).collect();

    match (map, pairs) {
        (Ok(map), Ok(pairs)) => assert!(map.len() <= pairs.len()),
        (Err(a), Err(b)) => assert_eq!(a, b),
        (map, pairs) => panic!("map {map:?} disagrees with iterator {pairs:?}"),
    }
});
