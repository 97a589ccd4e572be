use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "cross-dupe")]
#[command(about = "Reconcile copies of the same data across directory trees", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compare two or more directories and write a JSON verdict report
    Compare(CompareArgs),
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Directories to reconcile, as `Label:/path` or a bare path
    #[arg(required = true, num_args = 2..)]
    pub dirs: Vec<String>,

    /// Report file; defaults to a timestamped name in the output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for the timestamped report
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Seconds two modification times may differ and still count as equal
    #[arg(long)]
    pub mtime_fuzz: Option<f64>,

    /// Skip content digests; matching copies are reported as unverified
    #[arg(long)]
    pub no_checksum: bool,

    /// Include dot-files and dot-directories
    #[arg(long)]
    pub include_hidden: bool,
}

impl CompareArgs {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut cross_dupe_core::AppConfig) {
        if let Some(fuzz) = self.mtime_fuzz {
            config.mtime_fuzz_seconds = fuzz;
        }
        if self.no_checksum {
            config.use_checksum = false;
        }
        if self.include_hidden {
            config.include_hidden = true;
        }
    }
}
