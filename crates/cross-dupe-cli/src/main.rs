mod commands;
mod logging;
mod progress;
mod report;

use std::process;

use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, CompareArgs};
use cross_dupe_core::{AppConfig, DirectoryRoot, ReconcileEngine};
use dotenv::dotenv;
use progress::CliReporter;
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match cross_dupe_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    match args.command {
        Some(Commands::Compare(compare)) => {
            if let Err(err) = run_compare(config, &compare) {
                error!("Error: {}", err);
                process::exit(1);
            }
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn run_compare(mut config: AppConfig, args: &CompareArgs) -> Result<(), Box<dyn std::error::Error>> {
    args.apply(&mut config);
    let roots: Vec<DirectoryRoot> = args.dirs.iter().map(|d| DirectoryRoot::parse(d)).collect();
    for root in &roots {
        info!("  [{}] {}", root.label, root.path.display());
    }

    let engine = ReconcileEngine::new(config);
    let reporter = CliReporter::new();
    let result = engine.reconcile(&roots, &reporter)?;

    let path = report::report_path(args.output.as_deref(), &args.output_dir, chrono::Local::now());
    report::write_report(&path, &result)?;

    println!();
    info!(
        "Scan: {}, Match: {}, Folders: {}",
        format!("{:.2}s", result.timings.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.timings.match_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.timings.folder_duration.as_secs_f64()).green(),
    );
    println!("{} JSON report → {}", "✓".green(), path.display());
    report::print_summary(&result);

    Ok(())
}
