use std::io::Cursor;

use proptest::prelude::*;
use rdelta::sync::{Operation, OperationStats};
use rdelta::{SyncOptions, engine, sync_streams};

fn ops_for(old: &[u8], new: &[u8], opts: &SyncOptions) -> Vec<Operation> {
    engine::delta(engine::signature(old, opts).unwrap(), new, opts).unwrap()
}

/// Old/new pairs in the four shapes the generator has to handle.
fn mutation() -> impl Strategy<Value = (Vec<u8>, Vec<u8>)> {
    (proptest::collection::vec(any::<u8>(), 1..2048), any::<prop::sample::Index>(), 0u8..4)
        .prop_map(|(message, cut, mode)| {
            let n = cut.index(message.len()) + 1;
            match mode {
                // expand
                0 => (message[..n].to_vec(), message),
                // shrink
                1 => (message.clone(), message[..n].to_vec()),
                // prepend
                2 => (message[n..].to_vec(), message),
                // mix
                _ => {
                    let m = (n / 2).max(1).min(n);
                    (message[m..n].to_vec(), message)
                }
            }
        })
}

proptest! {
    #[test]
    fn prop_roundtrip(
        old in proptest::collection::vec(any::<u8>(), 0..4096),
        new in proptest::collection::vec(any::<u8>(), 0..4096),
        block_size in 1usize..64
    ) {
        let opts = SyncOptions::with_block_size(block_size);
        prop_assert_eq!(engine::sync(&old, &new, &opts).unwrap(), new);
    }

    #[test]
    fn prop_mutation_modes_roundtrip(
        (old, new) in mutation(),
        block_size in 1usize..256,
        coalesce in any::<bool>()
    ) {
        let opts = SyncOptions {
            coalesce_blocks: coalesce,
            ..SyncOptions::with_block_size(block_size)
        };
        let ops = ops_for(&old, &new, &opts);
        prop_assert_eq!(engine::patch(&old, &ops, &opts).unwrap(), new.clone());

        let mut old_reader = Cursor::new(&old[..]);
        let (out, stats) = sync_streams(&mut old_reader, &new[..], Vec::new(), &opts, 2).unwrap();
        prop_assert_eq!(stats.bytes_written, new.len() as u64);
        prop_assert_eq!(out, new);
    }

    #[test]
    fn prop_literals_are_bounded(
        old in proptest::collection::vec(any::<u8>(), 0..1024),
        new in proptest::collection::vec(any::<u8>(), 0..4096),
        block_size in 1usize..32,
        bound in 1usize..100
    ) {
        let opts = SyncOptions {
            max_literal_run: bound,
            ..SyncOptions::with_block_size(block_size)
        };
        for op in ops_for(&old, &new, &opts) {
            if let Operation::Literal(data) = op {
                prop_assert!(!data.is_empty());
                prop_assert!(data.len() <= bound, "literal {} > bound {}", data.len(), bound);
            }
        }
    }

    #[test]
    fn prop_identical_content_is_all_copies(
        data in proptest::collection::vec(any::<u8>(), 1..4096),
        block_size in 1usize..128
    ) {
        let opts = SyncOptions::with_block_size(block_size);
        let ops = ops_for(&data, &data, &opts);
        prop_assert!(ops.iter().all(|op| !op.is_literal()));
        prop_assert_eq!(ops.len(), data.len().div_ceil(block_size));
    }

    #[test]
    fn prop_operation_bytes_add_up(
        old in proptest::collection::vec(any::<u8>(), 0..2048),
        new in proptest::collection::vec(any::<u8>(), 0..2048),
        block_size in 1usize..64
    ) {
        let opts = SyncOptions::with_block_size(block_size);
        let ops = ops_for(&old, &new, &opts);
        let stats: OperationStats = ops.iter().collect();
        let copied: u64 = ops
            .iter()
            .filter_map(|op| match op {
                Operation::BlockCopy { index } => {
                    let start = *index as usize * block_size;
                    Some((old.len() - start).min(block_size) as u64)
                }
                _ => None,
            })
            .sum();
        prop_assert_eq!(stats.literal_bytes + copied, new.len() as u64);
    }
}

#[test]
#[ignore = "performance properties are workload and machine dependent"]
fn perf_property_delta_not_pathological() {
    use std::time::Instant;
    let make = |n: usize| -> Vec<u8> { (0..n).map(|i| (i % 251) as u8).collect() };
    let old = make(8 * 1024 * 1024);
    let mut new = old.clone();
    for i in (0..new.len()).step_by(4096) {
        new[i] = new[i].wrapping_add(3);
    }

    let opts = SyncOptions::default();
    let t0 = Instant::now();
    let out = engine::sync(&old, &new, &opts).unwrap();
    let dt = t0.elapsed();
    assert_eq!(out, new);
    assert!(dt.as_secs_f64() < 10.0, "sync took {dt:?}");
}
