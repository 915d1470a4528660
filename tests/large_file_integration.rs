use rdelta::SyncOptions;
use rdelta::io::{DeltaFileOptions, delta_file, patch_file, signature_file, sync_file};
use std::io::{Read, Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

const GIB: u64 = 1024 * 1024 * 1024;

fn assert_same_at(a: &std::path::Path, b: &std::path::Path, offsets: &[u64]) {
    let mut a = std::fs::File::open(a).unwrap();
    let mut b = std::fs::File::open(b).unwrap();
    for &off in offsets {
        a.seek(SeekFrom::Start(off)).unwrap();
        b.seek(SeekFrom::Start(off)).unwrap();
        let mut ab = [0u8; 32];
        let mut bb = [0u8; 32];
        a.read_exact(&mut ab).unwrap();
        b.read_exact(&mut bb).unwrap();
        assert_eq!(ab, bb, "mismatch at offset {off}");
    }
}

#[test]
#[ignore = "multi-GB test is opt-in due runtime and disk requirements"]
fn multi_gb_sparse_file_roundtrip() {
    let mut old = NamedTempFile::new().unwrap();
    let mut new = NamedTempFile::new().unwrap();
    let sig = NamedTempFile::new().unwrap();
    let delta = NamedTempFile::new().unwrap();
    let output = NamedTempFile::new().unwrap();

    // Sparse 2 GiB files with a few deterministic mutations.
    old.as_file_mut().set_len(2 * GIB).unwrap();
    new.as_file_mut().set_len(2 * GIB).unwrap();

    old.as_file_mut().seek(SeekFrom::Start(64 * 1024)).unwrap();
    old.as_file_mut().write_all(b"baseline-block").unwrap();

    new.as_file_mut().seek(SeekFrom::Start(64 * 1024)).unwrap();
    new.as_file_mut().write_all(b"mutated-block!").unwrap();
    new.as_file_mut().seek(SeekFrom::Start(GIB)).unwrap();
    new.as_file_mut().write_all(b"middle-chunk").unwrap();

    let opts = SyncOptions::with_block_size(64 * 1024);
    let signed = signature_file(old.path(), sig.path(), &opts).unwrap();
    assert_eq!(signed.blocks, 2 * GIB / (64 * 1024));

    let tuning = DeltaFileOptions {
        coalesce_blocks: true,
        ..Default::default()
    };
    let d = delta_file(sig.path(), new.path(), delta.path(), tuning).unwrap();
    assert_eq!(d.new_size, 2 * GIB);
    assert!(d.delta_size < 1024 * 1024, "delta is {} bytes", d.delta_size);

    let p = patch_file(old.path(), delta.path(), output.path()).unwrap();
    assert_eq!(p.output_size, 2 * GIB);
    assert_eq!(p.output_sha256, d.new_sha256);

    assert_same_at(
        output.path(),
        new.path(),
        &[0, 64 * 1024, GIB, 2 * GIB - 32],
    );
}

#[test]
#[ignore = "streams hundreds of MiB through the threaded pipeline"]
fn threaded_sync_of_large_files() {
    let mut old = NamedTempFile::new().unwrap();
    let mut new = NamedTempFile::new().unwrap();
    let output = NamedTempFile::new().unwrap();

    let chunk: Vec<u8> = (0..1024 * 1024u32)
        .map(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8)
        .collect();
    for i in 0..256u32 {
        old.write_all(&chunk).unwrap();
        if i % 17 == 0 {
            new.write_all(b"inserted bytes shift everything after them").unwrap();
        }
        new.write_all(&chunk).unwrap();
    }
    old.flush().unwrap();
    new.flush().unwrap();

    let stats = sync_file(
        old.path(),
        new.path(),
        output.path(),
        &SyncOptions::default(),
        64,
    )
    .unwrap();
    let new_len = std::fs::metadata(new.path()).unwrap().len();
    assert_eq!(stats.output_size, new_len);
    assert_same_at(output.path(), new.path(), &[0, 12_345_678, new_len - 32]);
}

#[test]
fn edge_case_matrix() {
    let cases: [(&[u8], &[u8]); 5] = [
        (b"", b""),
        (b"", b"x"),
        (b"x", b""),
        (b"\0\0\0\0\0", b"\0\0\0\0\0"),
        (b"\0\0\0\0\0", b"\0\0\0\0\x01"),
    ];

    for (old, new) in cases {
        for block_size in [1, 2, 5, 6] {
            let opts = SyncOptions::with_block_size(block_size);
            let delta = rdelta::engine::diff(old, new, &opts).unwrap();
            assert_eq!(rdelta::engine::apply(old, &delta).unwrap(), new);
        }
    }
}
