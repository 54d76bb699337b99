#![no_main]

use libfuzzer_sys::fuzz_target;

use columnar_csv::{Decoder, Row};

fn decode(data: &[u8], capacity: usize) -> Vec<Row> {
    let mut decoder = Decoder::new();
    let mut rows = Vec::new();

    for chunk in data.chunks(capacity) {
        decoder.feed(chunk, &mut rows).unwrap();
    }

    decoder.finish(&mut rows).unwrap();

    rows
}

fuzz_target!(|data: &[u8]| {
    let expected = decode(data, data.len().max(1));

    for capacity in [7, 2, 1] {
        assert_eq!(decode(data, capacity), expected);
    }
});
