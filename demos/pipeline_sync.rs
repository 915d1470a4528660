use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use rdelta::{SyncOptions, sync_streams};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let old_path = Path::new("old.bin");
    let new_path = Path::new("new.bin");
    let output_path = Path::new("restored.bin");

    let mut old = File::open(old_path)?;
    let new = File::open(new_path)?;
    let output = BufWriter::new(File::create(output_path)?);

    let opts = SyncOptions {
        coalesce_blocks: true,
        ..SyncOptions::default()
    };
    let (_, stats) = sync_streams(&mut old, new, output, &opts, 64)?;

    println!(
        "sync: blocks={} operations={} output={}",
        stats.blocks, stats.operations, stats.bytes_written
    );
    Ok(())
}
