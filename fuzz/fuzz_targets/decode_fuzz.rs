#![no_main]
use libfuzzer_sys::fuzz_target;
use rdelta::engine;
use rdelta::wire::{DeltaReader, SignatureReader};
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must decode to errors, never panics.
    if let Ok(reader) = SignatureReader::new(Cursor::new(data)) {
        for record in reader {
            if record.is_err() {
                break;
            }
        }
    }
    if let Ok(reader) = DeltaReader::new(Cursor::new(data)) {
        for op in reader {
            if op.is_err() {
                break;
            }
        }
    }

    let _ = engine::apply(&[], data);
    if data.len() >= 2 {
        let split = data.len() / 2;
        let (old, delta) = data.split_at(split);
        let _ = engine::apply(old, delta);
    }
});
