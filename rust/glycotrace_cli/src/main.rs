mod cli;
mod config;
mod errors;
mod processing;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::{
    Cli,
    Commands,
};

#[cfg(target_os = "windows")]
use mimalloc::MiMalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> std::result::Result<(), errors::CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        ) // RUST_LOG overrides the default
        .init();

    let args = Cli::parse();
    match args.command {
        Commands::Run(args) => processing::main_run(args),
        Commands::Worker(args) => processing::main_worker(args),
        Commands::Merge(args) => processing::main_merge(args),
        Commands::WriteTemplate(args) => processing::main_write_template(args),
    }
}
