/// Trait for reporting reconciliation progress.
///
/// The CLI implements it with indicatif bars; all methods default to no-ops.
/// Match progress is reported from worker threads.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self, _label: &str) {}
    fn on_scan_complete(&self, _label: &str, _total_files: usize, _duration_secs: f64) {}
    fn on_match_start(&self, _candidate_keys: usize) {}
    fn on_match_progress(&self, _keys_done: usize, _total_keys: usize) {}
    fn on_match_complete(
        &self,
        _duplicates: usize,
        _conflicts: usize,
        _symlinks: usize,
        _duration_secs: f64,
    ) {
    }
    fn on_folder_analysis_start(&self) {}
    fn on_folder_analysis_complete(&self, _folders: usize, _safe_roots: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
