use chrono::{DateTime, Local};
use colored::*;
use cross_dupe_core::Reconciliation;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Where the report goes: an explicit file wins, otherwise a timestamped name
/// inside `output_dir`.
pub fn report_path(output: Option<&Path>, output_dir: &Path, now: DateTime<Local>) -> PathBuf {
    match output {
        Some(path) => path.to_path_buf(),
        None => output_dir.join(format!("cross_dupe_report_{}.json", now.format("%y%m%d%H%M"))),
    }
}

pub fn write_report(path: &Path, result: &Reconciliation) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    result.write_json(&mut writer)?;
    writer.flush()?;
    Ok(())
}

pub fn print_summary(result: &Reconciliation) {
    let summary = &result.summary;
    let total: usize = summary.total_files.iter().map(|c| c.count).sum();

    println!();
    println!("{}", "Summary".bold());
    println!("  Total files : {}", total);
    for (count, unique) in summary.total_files.iter().zip(&summary.unique_counts) {
        println!(
            "  {:20}: {} files ({} unique)",
            count.label, count.count, unique.count
        );
    }

    println!();
    println!(
        "  Duplicate groups : {}",
        format!("{}", result.duplicates.len()).green()
    );
    for pair in &summary.pairwise_counts {
        println!("    {} <-> {}: {}", pair.a, pair.b, pair.count);
    }
    if summary.total_files.len() > 2 {
        println!(
            "    All {} directories: {}",
            summary.total_files.len(),
            summary.all_directories_count
        );
    }

    if !result.conflicts.is_empty() {
        println!(
            "  Conflict groups  : {}",
            format!("{}", result.conflicts.len()).red()
        );
    }
    let diverged = result.diverged().count();
    if diverged > 0 {
        println!(
            "\n  {} {} file(s) have diverged versions",
            "⚠".yellow(),
            diverged
        );
    }

    println!("\n  Folder relationships:");
    for (relationship, count) in &summary.relationship_counts {
        println!("    {:20}: {}", relationship.to_string(), count);
    }
    if !result.safe_to_delete.is_empty() {
        println!("\n  Safe to delete ({} roots):", result.safe_to_delete.len());
        for path in &result.safe_to_delete {
            println!("    {}", path.cyan());
        }
    }
}
