#![no_main]
use libfuzzer_sys::fuzz_target;
use rdelta::{SyncOptions, engine};

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    // First byte: mode and coalescing. Second byte: block size.
    let flags = data[0];
    let block_size = 1 + data[1] as usize % 64;
    let message = &data[2..];
    let cut = 1 + message.len() / 2;

    let (old, new): (&[u8], &[u8]) = match flags % 4 {
        // expand
        0 => (&message[..cut.min(message.len())], message),
        // shrink
        1 => (message, &message[..cut.min(message.len())]),
        // prepend
        2 => (&message[cut.min(message.len())..], message),
        // mix
        _ => (&message[cut / 2..cut.min(message.len())], message),
    };

    let opts = SyncOptions {
        coalesce_blocks: flags & 4 != 0,
        max_literal_run: 1 + data[1] as usize,
        ..SyncOptions::with_block_size(block_size)
    };

    let out = engine::sync(old, new, &opts).unwrap();
    assert_eq!(out, new);

    let delta = engine::diff(old, new, &opts).unwrap();
    assert_eq!(engine::apply(old, &delta).unwrap(), new);
});
