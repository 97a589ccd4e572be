use ahash::AHashSet;
use rayon::prelude::*;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

use super::classify::{classify, ContentMatch, ContentVerdict, PairVerdict, VersionRank, VersionStatus};
use super::index::{CandidateIndex, MatchKey};
use super::index_pairs;
use crate::config::MatchOptions;
use crate::hasher::ContentDigest;
use crate::progress::ProgressReporter;
use crate::scanner::FileRecord;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// One directory's copy of a grouped file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CopyDetail {
    pub label: String,
    pub rel_path: String,
    pub size: Option<u64>,
    pub mod_time: Option<f64>,
    pub is_link: bool,
    pub link_target: Option<String>,
}

impl CopyDetail {
    fn of(label: &str, record: &FileRecord) -> Self {
        Self {
            label: label.to_string(),
            rel_path: record.rel_path.clone(),
            size: record.size(),
            mod_time: record.mod_time,
            is_link: record.is_link(),
            link_target: record.link_target().map(str::to_string),
        }
    }
}

/// Aggregated N-way verdict for a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupVerdict {
    Content(ContentVerdict),
    MixedType,
}

impl GroupVerdict {
    pub fn content_match(&self) -> ContentMatch {
        match self {
            GroupVerdict::Content(v) => v.content().into(),
            GroupVerdict::MixedType => ContentMatch::MixedType,
        }
    }

    pub fn version_status(&self) -> VersionStatus {
        match self {
            GroupVerdict::Content(v) => v.version().into(),
            GroupVerdict::MixedType => VersionStatus::Conflict,
        }
    }

    pub fn is_conflict(&self) -> bool {
        match self {
            GroupVerdict::Content(v) => v.is_conflict(),
            GroupVerdict::MixedType => true,
        }
    }
}

impl Serialize for GroupVerdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("GroupVerdict", 2)?;
        state.serialize_field("content_match", &self.content_match())?;
        state.serialize_field("version_status", &self.version_status())?;
        state.end()
    }
}

/// Which copy is newest, and by how much, for a group whose copies diverged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Divergence {
    pub newest_in: String,
    pub age_gap_days: f64,
}

/// One logical file found in two or more directories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub rel_path: String,
    pub name_display: String,
    pub size: Option<u64>,
    #[serde(flatten)]
    pub verdict: GroupVerdict,
    pub labels: Vec<String>,
    pub copies: Vec<CopyDetail>,
    pub divergence: Option<Divergence>,
}

impl Group {
    fn new(present: &[(&str, &FileRecord)], verdict: GroupVerdict) -> Self {
        let (_, representative) = present[0];
        let divergence = match verdict {
            GroupVerdict::Content(v) if v.version() >= VersionRank::Diverged => {
                divergence_of(present)
            }
            _ => None,
        };

        Self {
            rel_path: representative.rel_path.clone(),
            name_display: representative.name_display.clone(),
            size: present.iter().find_map(|(_, r)| r.size()),
            verdict,
            labels: present.iter().map(|(l, _)| l.to_string()).collect(),
            copies: present.iter().map(|(l, r)| CopyDetail::of(l, r)).collect(),
            divergence,
        }
    }

    pub fn content_match(&self) -> ContentMatch {
        self.verdict.content_match()
    }

    pub fn version_status(&self) -> VersionStatus {
        self.verdict.version_status()
    }

    pub fn is_conflict(&self) -> bool {
        self.verdict.is_conflict()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// Newest copy and the spread of known timestamps, in days.
fn divergence_of(present: &[(&str, &FileRecord)]) -> Option<Divergence> {
    let known: Vec<(&str, f64)> = present
        .iter()
        .filter_map(|(l, r)| r.mod_time.map(|t| (*l, t)))
        .collect();

    let (newest_in, newest) = known
        .iter()
        .copied()
        .fold(None, |best: Option<(&str, f64)>, (l, t)| match best {
            Some((_, bt)) if bt >= t => best,
            _ => Some((l, t)),
        })?;
    let oldest = known.iter().map(|(_, t)| *t).fold(newest, f64::min);
    let age_gap_days = ((newest - oldest) / SECONDS_PER_DAY * 100.0).round() / 100.0;

    Some(Divergence {
        newest_in: newest_in.to_string(),
        age_gap_days,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkTarget {
    pub label: String,
    pub rel_path: String,
    pub target: Option<String>,
}

/// Symlinks sharing a name across directories, compared by resolved target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymlinkEntry {
    pub rel_path: String,
    pub name_display: String,
    pub labels: Vec<String>,
    pub targets: Vec<LinkTarget>,
    pub version_status: VersionStatus,
}

impl SymlinkEntry {
    fn new(present: &[(&str, &FileRecord)], all_match: bool) -> Self {
        let (_, representative) = present[0];
        Self {
            rel_path: representative.rel_path.clone(),
            name_display: representative.name_display.clone(),
            labels: present.iter().map(|(l, _)| l.to_string()).collect(),
            targets: present
                .iter()
                .map(|(l, r)| LinkTarget {
                    label: l.to_string(),
                    rel_path: r.rel_path.clone(),
                    target: r.link_target().map(str::to_string),
                })
                .collect(),
            version_status: if all_match {
                VersionStatus::TargetIdentical
            } else {
                VersionStatus::TargetDiverged
            },
        }
    }

    pub fn targets_match(&self) -> bool {
        self.version_status == VersionStatus::TargetIdentical
    }
}

/// Running join of pair verdicts for one key. `MixedType` absorbs everything,
/// `Symlink` absorbs content verdicts, content verdicts take the worst case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fold {
    Content(ContentVerdict),
    Symlink { all_match: bool },
    MixedType,
}

impl From<PairVerdict> for Fold {
    fn from(verdict: PairVerdict) -> Self {
        match verdict {
            PairVerdict::Content(v) => Fold::Content(v),
            PairVerdict::Symlink { targets_match } => Fold::Symlink {
                all_match: targets_match,
            },
            PairVerdict::MixedType => Fold::MixedType,
        }
    }
}

impl Fold {
    fn join(self, other: Self) -> Self {
        match (self, other) {
            (Fold::MixedType, _) | (_, Fold::MixedType) => Fold::MixedType,
            (Fold::Symlink { all_match: a }, Fold::Symlink { all_match: b }) => Fold::Symlink {
                all_match: a && b,
            },
            (s @ Fold::Symlink { .. }, Fold::Content(_))
            | (Fold::Content(_), s @ Fold::Symlink { .. }) => s,
            (Fold::Content(a), Fold::Content(b)) => Fold::Content(a.join(b)),
        }
    }
}

/// What one match key turned into.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome {
    Group(Group),
    Symlink(SymlinkEntry),
}

/// All groups found in one run, split by bucket.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Aggregation {
    pub duplicates: Vec<Group>,
    pub conflicts: Vec<Group>,
    pub symlinks: Vec<SymlinkEntry>,
    /// Keys whose pairs could not all be classified.
    pub dropped_keys: usize,
}

impl Aggregation {
    fn push_group(&mut self, group: Group) {
        if group.is_conflict() {
            self.conflicts.push(group);
        } else {
            self.duplicates.push(group);
        }
    }

    fn classified_paths(&self) -> AHashSet<String> {
        let groups = self.duplicates.iter().chain(&self.conflicts);
        groups
            .flat_map(|g| g.copies.iter().map(|c| c.rel_path.to_lowercase()))
            .chain(
                self.symlinks
                    .iter()
                    .flat_map(|s| s.targets.iter().map(|t| t.rel_path.to_lowercase())),
            )
            .collect()
    }
}

/// Fold one key: classify every pair of participating directories, then join.
/// Returns `None` if fewer than two directories hold the key or any pair is
/// not comparable.
pub fn aggregate_key(
    key: &MatchKey,
    indexes: &[CandidateIndex<'_>],
    options: &MatchOptions,
    digest: &dyn ContentDigest,
) -> Option<KeyOutcome> {
    let present: Vec<(&str, &FileRecord)> = indexes
        .iter()
        .filter_map(|idx| idx.first(key).map(|r| (idx.label, r)))
        .collect();
    if present.len() < 2 {
        return None;
    }

    let folded = index_pairs(present.len())
        .map(|(i, j)| classify(present[i].1, present[j].1, options, digest).map(Fold::from))
        .collect::<Option<Vec<Fold>>>()?
        .into_iter()
        .reduce(Fold::join)?;

    Some(match folded {
        Fold::Content(v) => KeyOutcome::Group(Group::new(&present, GroupVerdict::Content(v))),
        Fold::MixedType => KeyOutcome::Group(Group::new(&present, GroupVerdict::MixedType)),
        Fold::Symlink { all_match } => KeyOutcome::Symlink(SymlinkEntry::new(&present, all_match)),
    })
}

/// Group every match key shared by two or more directories, then recover
/// symlink/regular-file clashes the key index cannot see.
pub fn aggregate(
    indexes: &[CandidateIndex<'_>],
    options: &MatchOptions,
    digest: &dyn ContentDigest,
    reporter: &dyn ProgressReporter,
) -> Aggregation {
    let mut keys: Vec<&MatchKey> = shared(indexes.iter().map(|idx| idx.keys()));
    keys.sort();
    info!("Classifying {} candidate keys...", keys.len());
    reporter.on_match_start(keys.len());

    let done = AtomicUsize::new(0);
    let total = keys.len();
    let outcomes: Vec<Option<KeyOutcome>> = keys
        .par_iter()
        .map(|key| {
            let outcome = aggregate_key(key, indexes, options, digest);
            reporter.on_match_progress(done.fetch_add(1, Ordering::Relaxed) + 1, total);
            outcome
        })
        .collect();

    let mut aggregation = Aggregation::default();
    for outcome in outcomes {
        match outcome {
            Some(KeyOutcome::Group(group)) => aggregation.push_group(group),
            Some(KeyOutcome::Symlink(entry)) => aggregation.symlinks.push(entry),
            None => aggregation.dropped_keys += 1,
        }
    }

    let recovered = recover_mixed_types(indexes, &aggregation.classified_paths());
    debug!("Recovered {} mixed-type conflicts by path", recovered.len());
    aggregation.conflicts.extend(recovered);

    aggregation.duplicates.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    aggregation.conflicts.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    aggregation.symlinks.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    aggregation
}

/// Paths held by a symlink in one directory and a regular file in another.
/// Paths already covered by a group are skipped.
pub fn recover_mixed_types(
    indexes: &[CandidateIndex<'_>],
    classified: &AHashSet<String>,
) -> Vec<Group> {
    let mut paths: Vec<&String> = shared(indexes.iter().map(|idx| idx.path_keys()));
    paths.sort();

    paths
        .into_iter()
        .filter(|path| !classified.contains(path.as_str()))
        .filter_map(|path| {
            let present: Vec<(&str, &FileRecord)> = indexes
                .iter()
                .filter_map(|idx| idx.by_path(path).map(|r| (idx.label, r)))
                .collect();
            let any_link = present.iter().any(|(_, r)| r.is_link());
            let any_regular = present.iter().any(|(_, r)| !r.is_link());
            (any_link && any_regular).then(|| Group::new(&present, GroupVerdict::MixedType))
        })
        .collect()
}

/// Items that occur in at least two of the given sets.
fn shared<'k, T, I>(sets: impl Iterator<Item = I>) -> Vec<&'k T>
where
    T: Eq + std::hash::Hash + 'k,
    I: Iterator<Item = &'k T>,
{
    let mut seen: AHashSet<&T> = AHashSet::new();
    let mut twice: AHashSet<&T> = AHashSet::new();
    for set in sets {
        for item in set {
            if !seen.insert(item) {
                twice.insert(item);
            }
        }
    }
    twice.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::classify::ContentRank;
    use crate::progress::SilentReporter;
    use crate::scanner::ScannedDirectory;
    use std::collections::HashMap;
    use std::io;
    use std::path::{Path, PathBuf};

    struct TableDigest(HashMap<PathBuf, u64>);

    impl ContentDigest for TableDigest {
        fn digest(&self, path: &Path) -> io::Result<u64> {
            self.0
                .get(path)
                .copied()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "missing"))
        }
    }

    fn digests(entries: &[(&str, u64)]) -> TableDigest {
        TableDigest(entries.iter().map(|(p, h)| (PathBuf::from(p), *h)).collect())
    }

    fn dir(label: &str, records: Vec<FileRecord>) -> ScannedDirectory {
        ScannedDirectory::new(label, format!("/{}", label), records)
    }

    fn reg(label: &str, rel: &str, size: u64, mtime: f64) -> FileRecord {
        FileRecord::regular(Path::new(&format!("/{}", label)), rel, size, Some(mtime))
    }

    fn link(label: &str, rel: &str, target: Option<&str>) -> FileRecord {
        FileRecord::symlink(
            Path::new(&format!("/{}", label)),
            rel,
            target.map(str::to_string),
            Some(1.0),
        )
    }

    fn opts() -> MatchOptions {
        MatchOptions {
            mtime_fuzz_seconds: 5.0,
            use_checksum: true,
        }
    }

    fn run(dirs: &[ScannedDirectory], digest: &TableDigest) -> Aggregation {
        let indexes: Vec<CandidateIndex> = dirs.iter().map(CandidateIndex::build).collect();
        aggregate(&indexes, &opts(), digest, &SilentReporter)
    }

    #[test]
    fn test_one_divergent_pair_taints_the_group() {
        let dirs = vec![
            dir("A", vec![reg("A", "f.txt", 5, 1000.0)]),
            dir("B", vec![reg("B", "f.txt", 5, 1000.0)]),
            dir("C", vec![reg("C", "f.txt", 5, 1000.0 + 3.0 * 86_400.0)]),
        ];
        let d = digests(&[("/A/f.txt", 1), ("/B/f.txt", 1), ("/C/f.txt", 1)]);
        let result = run(&dirs, &d);

        assert_eq!(result.duplicates.len(), 1);
        let group = &result.duplicates[0];
        assert_eq!(group.labels, vec!["A", "B", "C"]);
        assert_eq!(group.content_match(), ContentMatch::Identical);
        assert_eq!(group.version_status(), VersionStatus::Diverged);
        let divergence = group.divergence.as_ref().unwrap();
        assert_eq!(divergence.newest_in, "C");
        assert_eq!(divergence.age_gap_days, 3.0);
    }

    #[test]
    fn test_phantom_pair_routes_group_to_conflicts() {
        let dirs = vec![
            dir("A", vec![reg("A", "f.txt", 5, 1000.0)]),
            dir("B", vec![reg("B", "f.txt", 5, 1000.0)]),
            dir("C", vec![reg("C", "f.txt", 5, 1001.0)]),
        ];
        let d = digests(&[("/A/f.txt", 1), ("/B/f.txt", 1), ("/C/f.txt", 2)]);
        let result = run(&dirs, &d);

        assert!(result.duplicates.is_empty());
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflicts[0].content_match(), ContentMatch::Different);
        assert_eq!(result.conflicts[0].version_status(), VersionStatus::Phantom);
    }

    #[test]
    fn test_unverified_outranks_identical() {
        let dirs = vec![
            dir("A", vec![reg("A", "f.txt", 5, 1000.0)]),
            dir("B", vec![reg("B", "f.txt", 5, 1000.0)]),
            dir("C", vec![reg("C", "f.txt", 5, 1000.0)]),
        ];
        // C cannot be read.
        let d = digests(&[("/A/f.txt", 1), ("/B/f.txt", 1)]);
        let result = run(&dirs, &d);
        let group = &result.duplicates[0];
        assert_eq!(group.content_match(), ContentMatch::Unverified);
        assert_eq!(group.version_status(), VersionStatus::Same);
        assert!(group.divergence.is_none());
    }

    #[test]
    fn test_aggregate_is_at_least_every_pair() {
        let dirs = vec![
            dir("A", vec![reg("A", "f.txt", 5, 1000.0)]),
            dir("B", vec![reg("B", "f.txt", 5, 50_000.0)]),
            dir("C", vec![reg("C", "f.txt", 5, 1000.0)]),
        ];
        let d = digests(&[("/A/f.txt", 1), ("/B/f.txt", 1), ("/C/f.txt", 9)]);
        let indexes: Vec<CandidateIndex> = dirs.iter().map(CandidateIndex::build).collect();
        let key = MatchKey::of(&dirs[0].records[0]);
        let Some(KeyOutcome::Group(group)) = aggregate_key(&key, &indexes, &opts(), &d) else {
            panic!("expected a group");
        };

        let GroupVerdict::Content(folded) = group.verdict else {
            panic!("expected a content verdict");
        };
        for (i, j) in index_pairs(3) {
            let pair = classify(&dirs[i].records[0], &dirs[j].records[0], &opts(), &d).unwrap();
            let PairVerdict::Content(v) = pair else {
                panic!("expected a content verdict");
            };
            assert!(folded.content() >= v.content());
            assert!(folded.version() >= v.version());
        }
        assert_eq!(folded.content(), ContentRank::Different);
    }

    #[test]
    fn test_directory_order_does_not_change_verdict() {
        let a = dir("A", vec![reg("A", "f.txt", 5, 1000.0)]);
        let b = dir("B", vec![reg("B", "f.txt", 5, 9000.0)]);
        let c = dir("C", vec![reg("C", "f.txt", 5, 1000.0)]);
        let d = digests(&[("/A/f.txt", 1), ("/B/f.txt", 2), ("/C/f.txt", 1)]);

        let forward = run(&[a.clone(), b.clone(), c.clone()], &d);
        let backward = run(&[c, b, a], &d);
        assert_eq!(
            forward.conflicts[0].verdict,
            backward.conflicts[0].verdict
        );
    }

    #[test]
    fn test_symlink_keys_become_symlink_entries() {
        let dirs = vec![
            dir("A", vec![link("A", "l", Some("/t"))]),
            dir("B", vec![link("B", "l", Some("/t"))]),
            dir("C", vec![link("C", "l", Some("/other"))]),
        ];
        let result = run(&dirs, &digests(&[]));
        assert!(result.duplicates.is_empty() && result.conflicts.is_empty());
        assert_eq!(result.symlinks.len(), 1);
        assert_eq!(result.symlinks[0].version_status, VersionStatus::TargetDiverged);
        assert_eq!(result.symlinks[0].targets.len(), 3);

        let agreeing = vec![
            dir("A", vec![link("A", "l", Some("/t"))]),
            dir("B", vec![link("B", "l", Some("/t"))]),
        ];
        let result = run(&agreeing, &digests(&[]));
        assert!(result.symlinks[0].targets_match());
    }

    #[test]
    fn test_mixed_types_recovered_by_path() {
        let dirs = vec![
            dir("A", vec![link("A", "docs/link.txt", Some("/data/target"))]),
            dir("B", vec![reg("B", "Docs/Link.txt", 12, 1000.0)]),
        ];
        let result = run(&dirs, &digests(&[]));
        assert!(result.duplicates.is_empty());
        assert_eq!(result.conflicts.len(), 1);
        let group = &result.conflicts[0];
        assert_eq!(group.content_match(), ContentMatch::MixedType);
        assert_eq!(group.version_status(), VersionStatus::Conflict);
        assert_eq!(group.size, Some(12));
        assert!(group.divergence.is_none());
    }

    #[test]
    fn test_paths_already_grouped_are_not_recovered() {
        let dirs = vec![
            dir("A", vec![reg("A", "f.txt", 5, 1.0)]),
            dir("B", vec![reg("B", "f.txt", 5, 1.0)]),
            dir("C", vec![link("C", "f.txt", None)]),
        ];
        let d = digests(&[("/A/f.txt", 1), ("/B/f.txt", 1)]);
        let result = run(&dirs, &d);
        assert_eq!(result.duplicates.len(), 1);
        assert!(result.conflicts.is_empty());
    }

    #[test]
    fn test_keys_in_one_directory_are_ignored() {
        let dirs = vec![
            dir("A", vec![reg("A", "only_a.txt", 5, 1.0)]),
            dir("B", vec![reg("B", "only_b.txt", 5, 1.0)]),
        ];
        let result = run(&dirs, &digests(&[]));
        assert!(result.duplicates.is_empty());
        assert!(result.conflicts.is_empty());
        assert_eq!(result.dropped_keys, 0);
    }
}
