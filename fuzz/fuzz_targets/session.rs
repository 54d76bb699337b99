#![no_main]

use libfuzzer_sys::fuzz_target;

use columnar_csv::{SessionBuilder, Table};

fuzz_target!(|data: &[u8]| {
    let mut table = Table::parse(["a:string:a", "b:int:b", "c:f64"]).unwrap();

    // Conversion errors are expected, panics are not
    let _ = SessionBuilder::with_chunk_size(3)
        .has_header(true)
        .decode_bytes(data, &mut table);
});
