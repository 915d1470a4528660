fn main() {
    #[cfg(feature = "cli")]
    rdelta::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("rdelta: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
