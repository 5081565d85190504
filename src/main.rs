/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Command line front end for crystal-symmetry

use clap::Parser;
use crystal_symmetry::cli::{self, Cli};

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    // RUST_LOG still takes precedence over -v
    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();

    log::info!("crystal-symmetry v{}", crystal_symmetry::VERSION);
    cli::run(&args)
}
