// Command-line front end for rdelta.
//
// One subcommand per stage plus `sync`, which runs all three in-process:
//
//   rdelta signature OLD SIG
//   rdelta delta SIG NEW DELTA
//   rdelta patch OLD DELTA OUT
//   rdelta sync OLD NEW OUT

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::config::{DEFAULT_BLOCK_SIZE, DEFAULT_CHANNEL_CAPACITY, LITERAL_RUN_FACTOR, SyncOptions};
use crate::error::Result;
use crate::hash::StrongHash;
use crate::io::{self, DeltaFileOptions};

// ---------------------------------------------------------------------------
// Value parsers
// ---------------------------------------------------------------------------

/// Parse a byte count with an optional K, M or G suffix.
fn parse_byte_size(s: &str) -> std::result::Result<usize, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty size string".into());
    }
    let (num_part, multiplier) = match s.as_bytes().last() {
        Some(b'k' | b'K') => (&s[..s.len() - 1], 1usize << 10),
        Some(b'm' | b'M') => (&s[..s.len() - 1], 1 << 20),
        Some(b'g' | b'G') => (&s[..s.len() - 1], 1 << 30),
        _ => (s, 1),
    };
    let num: usize = num_part
        .trim()
        .parse()
        .map_err(|e| format!("invalid size '{s}': {e}"))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size overflow: '{s}'"))
}

fn parse_hash(s: &str) -> std::result::Result<StrongHash, String> {
    StrongHash::from_name(s).ok_or_else(|| format!("unknown strong hash '{s}'"))
}

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// rsync-style signature, delta and patch tool.
#[derive(Parser, Debug)]
#[command(
    name = "rdelta",
    version,
    about = "rsync-style block signatures, deltas and patches",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Compute the block signature of an old file.
    Signature(SignatureArgs),
    /// Compute the delta from a signature to a new file.
    Delta(DeltaArgs),
    /// Rebuild a new file from an old file and a delta.
    Patch(PatchArgs),
    /// Rebuild a new file from an old file in one threaded pass.
    Sync(SyncArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Args, Debug)]
struct BlockArgs {
    /// Block size in bytes (supports K/M/G suffix).
    #[arg(
        long = "block-size",
        short = 'b',
        value_parser = parse_byte_size,
        default_value_t = DEFAULT_BLOCK_SIZE
    )]
    block_size: usize,

    /// Strong digest: sha256, sha512 (or blake3 when built with it).
    #[arg(long, value_parser = parse_hash, default_value = "sha256")]
    hash: StrongHash,
}

#[derive(Args, Debug)]
struct EmitArgs {
    /// Largest literal operation in bytes (default: 10 blocks).
    #[arg(long = "max-literal", value_parser = parse_byte_size)]
    max_literal: Option<usize>,

    /// Merge consecutive block copies into ranges.
    #[arg(long)]
    coalesce: bool,
}

#[derive(Args, Debug)]
struct SignatureArgs {
    #[command(flatten)]
    block: BlockArgs,

    /// Old file to sign.
    #[arg(value_hint = ValueHint::FilePath)]
    old: PathBuf,

    /// Signature output file.
    #[arg(value_hint = ValueHint::FilePath)]
    signature: PathBuf,
}

#[derive(Args, Debug)]
struct DeltaArgs {
    #[command(flatten)]
    emit: EmitArgs,

    /// Signature of the old file.
    #[arg(value_hint = ValueHint::FilePath)]
    signature: PathBuf,

    /// New file.
    #[arg(value_hint = ValueHint::FilePath)]
    new: PathBuf,

    /// Delta output file.
    #[arg(value_hint = ValueHint::FilePath)]
    delta: PathBuf,
}

#[derive(Args, Debug)]
struct PatchArgs {
    /// Old file the delta was computed against.
    #[arg(value_hint = ValueHint::FilePath)]
    old: PathBuf,

    /// Delta file.
    #[arg(value_hint = ValueHint::FilePath)]
    delta: PathBuf,

    /// Reconstructed output file.
    #[arg(value_hint = ValueHint::FilePath)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct SyncArgs {
    #[command(flatten)]
    block: BlockArgs,

    #[command(flatten)]
    emit: EmitArgs,

    /// Records/operations buffered between pipeline stages.
    #[arg(long = "channel-capacity", default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    channel_capacity: usize,

    #[arg(value_hint = ValueHint::FilePath)]
    old: PathBuf,

    #[arg(value_hint = ValueHint::FilePath)]
    new: PathBuf,

    #[arg(value_hint = ValueHint::FilePath)]
    output: PathBuf,
}

// ---------------------------------------------------------------------------
// Resolved options
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Command {
    Signature {
        old: PathBuf,
        signature: PathBuf,
        sync: SyncOptions,
    },
    Delta {
        signature: PathBuf,
        new: PathBuf,
        delta: PathBuf,
        tuning: DeltaFileOptions,
    },
    Patch {
        old: PathBuf,
        delta: PathBuf,
        output: PathBuf,
    },
    Sync {
        old: PathBuf,
        new: PathBuf,
        output: PathBuf,
        sync: SyncOptions,
        capacity: usize,
    },
    Config,
}

#[derive(Debug)]
struct Options {
    command: Command,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
}

fn sync_options(block: BlockArgs, emit: Option<&EmitArgs>) -> SyncOptions {
    let mut opts = SyncOptions {
        strong_hash: block.hash,
        ..SyncOptions::with_block_size(block.block_size)
    };
    if let Some(emit) = emit {
        if let Some(bound) = emit.max_literal {
            opts.max_literal_run = bound;
        }
        opts.coalesce_blocks = emit.coalesce;
    }
    opts
}

fn resolve_options(cli: Cli) -> Options {
    let command = match cli.command {
        Cmd::Signature(args) => Command::Signature {
            old: args.old,
            signature: args.signature,
            sync: sync_options(args.block, None),
        },
        Cmd::Delta(args) => Command::Delta {
            signature: args.signature,
            new: args.new,
            delta: args.delta,
            tuning: DeltaFileOptions {
                max_literal_run: args.emit.max_literal,
                coalesce_blocks: args.emit.coalesce,
            },
        },
        Cmd::Patch(args) => Command::Patch {
            old: args.old,
            delta: args.delta,
            output: args.output,
        },
        Cmd::Sync(args) => Command::Sync {
            sync: sync_options(args.block, Some(&args.emit)),
            old: args.old,
            new: args.new,
            output: args.output,
            capacity: args.channel_capacity,
        },
        Cmd::Config => Command::Config,
    };
    Options {
        command,
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        json_output: cli.json_output,
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("rdelta".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_config() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("rdelta version {version}");

    let blake3 = cfg!(feature = "blake3") as u8;
    let file_io = cfg!(feature = "file-io") as u8;
    eprintln!("BLAKE3={blake3}");
    eprintln!("FILE_IO={file_io}");
    eprintln!("DEFAULT_BLOCK_SIZE={DEFAULT_BLOCK_SIZE}");
    eprintln!("LITERAL_RUN_FACTOR={LITERAL_RUN_FACTOR}");
    eprintln!("DEFAULT_CHANNEL_CAPACITY={DEFAULT_CHANNEL_CAPACITY}");
    eprintln!("DEFAULT_HASH={}", StrongHash::default().hasher().name());
}

/// Refuse to clobber an existing output unless `-f` was given.
fn check_output(path: &Path, opts: &Options) -> std::result::Result<(), String> {
    if path.exists() && !opts.force {
        return Err(format!(
            "output file exists, use -f to overwrite: {}",
            path.display()
        ));
    }
    Ok(())
}

fn report(opts: &Options, summary: String, json: serde_json::Value) {
    if opts.verbose > 0 && !opts.quiet {
        eprintln!("rdelta: {summary}");
    }
    if opts.json_output {
        eprintln!("{json:#}");
    }
}

fn run_command(opts: &Options) -> Result<(), String> {
    match &opts.command {
        Command::Signature {
            old,
            signature,
            sync,
        } => {
            check_output(signature, opts)?;
            let stats = io::signature_file(old, signature, sync).map_err(stage("signature"))?;
            report(
                opts,
                format!(
                    "signature: old size: {}, blocks: {}, signature size: {}",
                    stats.old_size, stats.blocks, stats.signature_size
                ),
                serde_json::json!({
                    "command": "signature",
                    "old_size": stats.old_size,
                    "block_size": sync.block_size,
                    "hash": sync.strong_hash.hasher().name(),
                    "blocks": stats.blocks,
                    "signature_size": stats.signature_size,
                }),
            );
        }
        Command::Delta {
            signature,
            new,
            delta,
            tuning,
        } => {
            check_output(delta, opts)?;
            let stats = io::delta_file(signature, new, delta, *tuning).map_err(stage("delta"))?;
            let ops = &stats.operations;
            report(
                opts,
                format!(
                    "delta: new size: {}, operations: {}, literal bytes: {}, \
                     copied blocks: {}, delta size: {}",
                    stats.new_size,
                    ops.operations,
                    ops.literal_bytes,
                    ops.copied_blocks,
                    stats.delta_size
                ),
                serde_json::json!({
                    "command": "delta",
                    "new_size": stats.new_size,
                    "signature_blocks": stats.signature_blocks,
                    "operations": ops.operations,
                    "literal_ops": ops.literal_ops,
                    "literal_bytes": ops.literal_bytes,
                    "copy_ops": ops.copy_ops,
                    "copied_blocks": ops.copied_blocks,
                    "delta_size": stats.delta_size,
                    "new_sha256": io::to_hex(&stats.new_sha256),
                }),
            );
        }
        Command::Patch { old, delta, output } => {
            check_output(output, opts)?;
            let stats = io::patch_file(old, delta, output).map_err(stage("patch"))?;
            report(
                opts,
                format!(
                    "patch: operations: {}, output size: {}",
                    stats.operations, stats.output_size
                ),
                serde_json::json!({
                    "command": "patch",
                    "old_size": stats.old_size,
                    "delta_size": stats.delta_size,
                    "operations": stats.operations,
                    "output_size": stats.output_size,
                    "output_sha256": io::to_hex(&stats.output_sha256),
                }),
            );
        }
        Command::Sync {
            old,
            new,
            output,
            sync,
            capacity,
        } => {
            check_output(output, opts)?;
            let stats =
                io::sync_file(old, new, output, sync, *capacity).map_err(stage("sync"))?;
            report(
                opts,
                format!(
                    "sync: blocks: {}, operations: {}, output size: {}",
                    stats.blocks, stats.operations, stats.output_size
                ),
                serde_json::json!({
                    "command": "sync",
                    "old_size": stats.old_size,
                    "block_size": sync.block_size,
                    "blocks": stats.blocks,
                    "operations": stats.operations,
                    "output_size": stats.output_size,
                    "output_sha256": io::to_hex(&stats.output_sha256),
                }),
            );
        }
        Command::Config => cmd_config(),
    }
    Ok(())
}

fn stage(name: &'static str) -> impl Fn(crate::error::Error) -> String {
    move |e| format!("{name}: {e}")
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn log_filter(opts: &Options) -> &'static str {
    match (opts.quiet, opts.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    }
}

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(&opts)))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let exit_code = match run_command(&opts) {
        Ok(()) => 0,
        Err(msg) => {
            eprintln!("rdelta: {msg}");
            1
        }
    };
    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_opts(args: &[&str]) -> Options {
        let argv: Vec<String> = std::iter::once("rdelta".to_string())
            .chain(args.iter().map(|s| s.to_string()))
            .collect();
        let cli = Cli::try_parse_from(argv).expect("cli parse failed");
        resolve_options(cli)
    }

    #[test]
    fn parse_byte_size_suffixes() {
        assert_eq!(parse_byte_size("1").unwrap(), 1);
        assert_eq!(parse_byte_size("2K").unwrap(), 2 * 1024);
        assert_eq!(parse_byte_size("3m").unwrap(), 3 * 1024 * 1024);
        assert_eq!(parse_byte_size("4G").unwrap(), 4 * 1024 * 1024 * 1024);
        assert!(parse_byte_size("").is_err());
        assert!(parse_byte_size("12Q").is_err());
    }

    #[test]
    fn signature_subcommand_maps_correctly() {
        let opts = parse_opts(&[
            "signature",
            "--block-size",
            "2K",
            "--hash",
            "sha512",
            "old.bin",
            "old.sig",
        ]);
        match opts.command {
            Command::Signature {
                old,
                signature,
                sync,
            } => {
                assert_eq!(old, PathBuf::from("old.bin"));
                assert_eq!(signature, PathBuf::from("old.sig"));
                assert_eq!(sync.block_size, 2048);
                assert_eq!(sync.max_literal_run, 2048 * LITERAL_RUN_FACTOR);
                assert_eq!(sync.strong_hash.id(), StrongHash::Sha512.id());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn signature_defaults() {
        let opts = parse_opts(&["signature", "a", "b"]);
        match opts.command {
            Command::Signature { sync, .. } => {
                assert_eq!(sync.block_size, DEFAULT_BLOCK_SIZE);
                assert_eq!(sync.strong_hash.id(), StrongHash::Sha256.id());
                assert!(!sync.coalesce_blocks);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn delta_subcommand_maps_correctly() {
        let opts = parse_opts(&[
            "delta",
            "--max-literal",
            "64K",
            "--coalesce",
            "old.sig",
            "new.bin",
            "new.delta",
        ]);
        match opts.command {
            Command::Delta {
                signature,
                new,
                delta,
                tuning,
            } => {
                assert_eq!(signature, PathBuf::from("old.sig"));
                assert_eq!(new, PathBuf::from("new.bin"));
                assert_eq!(delta, PathBuf::from("new.delta"));
                assert_eq!(tuning.max_literal_run, Some(64 * 1024));
                assert!(tuning.coalesce_blocks);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn sync_subcommand_maps_correctly() {
        let opts = parse_opts(&[
            "--force",
            "sync",
            "-b",
            "512",
            "--max-literal",
            "100",
            "--channel-capacity",
            "4",
            "old",
            "new",
            "out",
        ]);
        assert!(opts.force);
        match opts.command {
            Command::Sync { sync, capacity, output, .. } => {
                assert_eq!(sync.block_size, 512);
                assert_eq!(sync.max_literal_run, 100);
                assert_eq!(capacity, 4);
                assert_eq!(output, PathBuf::from("out"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn unknown_hash_rejected() {
        let argv = ["rdelta", "signature", "--hash", "md5", "a", "b"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn patch_requires_three_paths() {
        assert!(Cli::try_parse_from(["rdelta", "patch", "old", "delta"]).is_err());
    }

    #[test]
    fn verbose_is_capped() {
        let opts = parse_opts(&["-vvvv", "config"]);
        assert_eq!(opts.verbose, 2);
        assert_eq!(log_filter(&opts), "debug");
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["rdelta", "-q", "-v", "config"]).is_err());
        let opts = parse_opts(&["-q", "--json", "config"]);
        assert!(opts.quiet && opts.json_output);
        assert_eq!(log_filter(&opts), "error");
    }

    #[test]
    fn existing_output_needs_force() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        std::fs::write(&out, b"x").unwrap();
        let path = out.to_str().unwrap();

        let opts = parse_opts(&["patch", "old", "delta", path]);
        assert!(check_output(&out, &opts).is_err());
        let opts = parse_opts(&["-f", "patch", "old", "delta", path]);
        assert!(check_output(&out, &opts).is_ok());
    }

    #[test]
    fn fuzz_entry_tolerates_garbage() {
        fuzz_try_parse_args(&["--block-size".into(), "\u{0}".into()]);
        fuzz_try_parse_args(&["sync".into()]);
    }
}
