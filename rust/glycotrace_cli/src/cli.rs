use clap::{
    Parser,
    Subcommand,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every worker in-process, then merge and write the results.
    Run(RunArgs),
    /// Run a single worker and persist its partial result.
    Worker(WorkerArgs),
    /// Merge the partial results of earlier workers and write the results.
    Merge(MergeArgs),
    /// Write a template configuration file.
    WriteTemplate(WriteTemplateArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct InputArgs {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Path to the target library (will over-write the config file)
    #[arg(short, long)]
    pub library_file: Option<PathBuf>,

    /// Sample spectrum files (will over-write the config file)
    #[arg(short, long, num_args = 1..)]
    pub sample_files: Vec<PathBuf>,

    /// Path to the output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Number of workers the library is split across
    #[arg(short, long)]
    pub workers: Option<usize>,
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct WorkerArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Zero-based index of the library chunk to process
    #[arg(long)]
    pub worker_index: usize,
}

#[derive(Parser, Debug, Clone)]
pub struct MergeArgs {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Path to the output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Number of workers that were launched
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Seconds to wait for missing partial results before merging anyway
    #[arg(long, default_value_t = 0)]
    pub wait_secs: u64,
}

#[derive(Parser, Debug)]
pub struct WriteTemplateArgs {
    /// The path to the template file to write.
    #[arg(short, long)]
    pub output_path: PathBuf,
}
