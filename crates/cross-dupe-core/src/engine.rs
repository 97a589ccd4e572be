use serde::Serialize;
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::analysis::folders::analyze_folders;
use crate::analysis::groups::aggregate;
use crate::analysis::index::CandidateIndex;
use crate::analysis::{FolderComparison, Group, RunSummary, SymlinkEntry};
use crate::config::{self, AppConfig, DirectoryRoot, MatchOptions};
use crate::error::Error;
use crate::hasher::{CachedDigest, ContentDigest, XxHashDigest};
use crate::progress::{ProgressReporter, SilentReporter};
use crate::scanner::{self, ScanOptions, ScannedDirectory};

pub struct ReconcileEngine {
    config: AppConfig,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StageTimings {
    pub scan_duration: Duration,
    pub match_duration: Duration,
    pub folder_duration: Duration,
}

/// Everything one run found. Read-only once built.
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    pub generated_at: String,
    pub options: MatchOptions,
    pub directories: Vec<ScannedDirectory>,
    pub duplicates: Vec<Group>,
    pub conflicts: Vec<Group>,
    pub symlinks: Vec<SymlinkEntry>,
    pub folders: Vec<FolderComparison>,
    pub safe_to_delete: Vec<String>,
    pub summary: RunSummary,
    #[serde(skip)]
    pub timings: StageTimings,
}

impl Reconciliation {
    /// Duplicate groups whose copies no longer agree on modification time.
    pub fn diverged(&self) -> impl Iterator<Item = &Group> {
        self.duplicates.iter().filter(|g| g.divergence.is_some())
    }

    /// Write the verdict set as pretty-printed JSON.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), Error> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

impl ReconcileEngine {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Run the full pipeline over the given roots:
    /// 1. Scan each root (parallel walk)
    /// 2. Index, classify and aggregate candidate files
    /// 3. Compare shared folders and roll verdicts up the tree
    pub fn reconcile(
        &self,
        roots: &[DirectoryRoot],
        reporter: &dyn ProgressReporter,
    ) -> Result<Reconciliation, Error> {
        config::check_roots(roots)?;
        self.config.validate()?;

        let scan_options = ScanOptions::from_config(&self.config);
        info!("Scanning {} directories...", roots.len());
        let scan_start = Instant::now();
        let mut scanned = Vec::with_capacity(roots.len());
        for root in roots {
            reporter.on_scan_start(&root.label);
            let started = Instant::now();
            let dir = scanner::scan_directory(root, &scan_options)?;
            info!("  [{}] {} files found", root.label, dir.records.len());
            reporter.on_scan_complete(&root.label, dir.records.len(), started.elapsed().as_secs_f64());
            scanned.push(dir);
        }
        let scan_duration = scan_start.elapsed();

        let digest = XxHashDigest;
        let mut result = reconcile_with(scanned, &self.config.match_options(), &digest, reporter);
        result.timings.scan_duration = scan_duration;
        Ok(result)
    }
}

/// Reconcile already-scanned directories. The engine itself never fails;
/// unreadable files only weaken individual verdicts.
pub fn reconcile_scanned(
    dirs: Vec<ScannedDirectory>,
    options: &MatchOptions,
    digest: &dyn ContentDigest,
) -> Reconciliation {
    reconcile_with(dirs, options, digest, &SilentReporter)
}

pub fn reconcile_with(
    dirs: Vec<ScannedDirectory>,
    options: &MatchOptions,
    digest: &dyn ContentDigest,
    reporter: &dyn ProgressReporter,
) -> Reconciliation {
    let digest = CachedDigest::new(digest);

    info!("Matching files across directories...");
    let match_start = Instant::now();
    let indexes: Vec<CandidateIndex> = dirs.iter().map(CandidateIndex::build).collect();
    for idx in &indexes {
        let ambiguous = idx.ambiguous_keys();
        if ambiguous > 0 {
            warn!(
                "[{}] {} name+size keys match several files; the first of each is used",
                idx.label, ambiguous
            );
        }
    }
    let aggregation = aggregate(&indexes, options, &digest, reporter);
    let match_duration = match_start.elapsed();
    debug!(
        "Matching completed in {:.2}s: {} duplicates, {} conflicts, {} symlinks, {} keys dropped, {} digests ({} failed)",
        match_duration.as_secs_f64(),
        aggregation.duplicates.len(),
        aggregation.conflicts.len(),
        aggregation.symlinks.len(),
        aggregation.dropped_keys,
        digest.len(),
        digest.failures(),
    );
    reporter.on_match_complete(
        aggregation.duplicates.len(),
        aggregation.conflicts.len(),
        aggregation.symlinks.len(),
        match_duration.as_secs_f64(),
    );

    reporter.on_folder_analysis_start();
    let folder_start = Instant::now();
    let folders = analyze_folders(&dirs);
    let folder_duration = folder_start.elapsed();
    reporter.on_folder_analysis_complete(
        folders.comparisons.len(),
        folders.safe_to_delete.len(),
        folder_duration.as_secs_f64(),
    );

    let summary = RunSummary::compute(&dirs, &aggregation.duplicates, &folders.comparisons);

    Reconciliation {
        generated_at: chrono::Local::now().to_rfc3339(),
        options: *options,
        directories: dirs,
        duplicates: aggregation.duplicates,
        conflicts: aggregation.conflicts,
        symlinks: aggregation.symlinks,
        folders: folders.comparisons,
        safe_to_delete: folders.safe_to_delete,
        summary,
        timings: StageTimings {
            scan_duration: Duration::ZERO,
            match_duration,
            folder_duration,
        },
    }
}
