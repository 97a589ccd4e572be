use cross_dupe_core::ProgressReporter;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Indicatif progress display.
///
/// - Scan phase: one spinner per directory (file count unknown upfront)
/// - Match phase: bar over candidate keys
/// - Folder phase: spinner
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn spinner(&self, message: String) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars(TICK_CHARS),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self, label: &str) {
        self.spinner(format!("Scanning {}...", label));
    }

    fn on_scan_complete(&self, label: &str, total_files: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Scanned {}: {} files in {:.2}s",
            label, total_files, duration_secs
        );
    }

    fn on_match_start(&self, candidate_keys: usize) {
        let pb = ProgressBar::new(candidate_keys as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} Matching [{bar:30.cyan/dim}] {pos}/{len} candidate keys ({eta} remaining)",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─")
            .tick_chars(TICK_CHARS),
        );
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_match_progress(&self, keys_done: usize, _total_keys: usize) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                // Workers finish out of order; never move the bar backwards.
                if keys_done as u64 > pb.position() {
                    pb.set_position(keys_done as u64);
                }
            }
        }
    }

    fn on_match_complete(
        &self,
        duplicates: usize,
        conflicts: usize,
        symlinks: usize,
        duration_secs: f64,
    ) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Matching complete: {} duplicates, {} conflicts, {} symlinks in {:.2}s",
            duplicates, conflicts, symlinks, duration_secs
        );
    }

    fn on_folder_analysis_start(&self) {
        self.spinner("Analysing folder structure...".to_string());
    }

    fn on_folder_analysis_complete(&self, folders: usize, safe_roots: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Folder analysis complete: {} shared folders, {} safe to delete in {:.2}s",
            folders, safe_roots, duration_secs
        );
    }
}
