use std::convert::Infallible;
use std::io::{Cursor, Seek, SeekFrom};
use std::sync::mpsc;
use std::thread;

use rdelta::sync::BlockRecord;
use rdelta::{SyncOptions, apply_delta, build_delta, build_signature};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let old = b"I am the original content";
    let new = b"I am the new content";
    let opts = SyncOptions::with_block_size(3);

    let mut old_reader = Cursor::new(&old[..]);
    let mut signature: Vec<BlockRecord> = Vec::new();
    build_signature(&mut old_reader, &opts, |record| {
        signature.push(record);
        Ok::<_, Infallible>(())
    })?;

    // Operations stream to the applicator while the generator is running.
    let (tx, rx) = mpsc::channel();
    let gen_opts = opts.clone();
    let generator =
        thread::spawn(move || build_delta(&new[..], signature, &gen_opts, |op| tx.send(op)));

    old_reader.seek(SeekFrom::Start(0))?;
    let mut out = Vec::new();
    let written = apply_delta(&mut out, old_reader, rx, &opts)?;
    generator.join().map_err(|_| "generator panicked")??;

    assert_eq!(out, new);
    println!("reconstructed {written} bytes: {}", String::from_utf8_lossy(&out));
    Ok(())
}
