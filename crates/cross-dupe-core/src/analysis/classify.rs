use serde::Serialize;
use std::fmt;

use crate::config::MatchOptions;
use crate::error::Error;
use crate::hasher::ContentDigest;
use crate::scanner::{EntryKind, FileRecord};

/// How sure we are that two copies hold the same bytes. Ordered from best to
/// worst; aggregation keeps the worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentRank {
    Identical,
    Unverified,
    Different,
}

/// Whether copies still look like the same version. Ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionRank {
    Same,
    Diverged,
    /// Timestamps agree but content does not.
    Phantom,
}

/// A `(content, version)` pair for two regular files. Only combinations the
/// classifier can actually produce are constructible:
/// `Different` never pairs with `Same`, and `Phantom` only pairs with `Different`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ContentVerdict {
    content: ContentRank,
    version: VersionRank,
}

impl ContentVerdict {
    pub const IDENTICAL_SAME: Self = Self {
        content: ContentRank::Identical,
        version: VersionRank::Same,
    };

    pub fn new(content: ContentRank, version: VersionRank) -> Result<Self, Error> {
        if Self::is_valid(content, version) {
            Ok(Self { content, version })
        } else {
            Err(Error::InvalidVerdict(format!("{:?} with {:?}", content, version)))
        }
    }

    pub fn is_valid(content: ContentRank, version: VersionRank) -> bool {
        match content {
            ContentRank::Identical | ContentRank::Unverified => version != VersionRank::Phantom,
            ContentRank::Different => version != VersionRank::Same,
        }
    }

    fn metadata_only(mtime_same: bool) -> Self {
        Self {
            content: ContentRank::Unverified,
            version: if mtime_same {
                VersionRank::Same
            } else {
                VersionRank::Diverged
            },
        }
    }

    fn digested(equal: bool, mtime_same: bool) -> Self {
        let version = match (equal, mtime_same) {
            (_, false) => VersionRank::Diverged,
            (true, true) => VersionRank::Same,
            (false, true) => VersionRank::Phantom,
        };
        let content = if equal {
            ContentRank::Identical
        } else {
            ContentRank::Different
        };
        Self { content, version }
    }

    pub fn content(&self) -> ContentRank {
        self.content
    }

    pub fn version(&self) -> VersionRank {
        self.version
    }

    /// Worst-case join over both axes. Commutative, associative and idempotent,
    /// and closed over valid verdicts.
    pub fn join(self, other: Self) -> Self {
        Self {
            content: self.content.max(other.content),
            version: self.version.max(other.version),
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.content == ContentRank::Different
    }
}

/// Content relationship as reported to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentMatch {
    Identical,
    Unverified,
    Different,
    Symlink,
    MixedType,
}

/// Version relationship as reported to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    Same,
    Diverged,
    Phantom,
    TargetIdentical,
    TargetDiverged,
    Conflict,
}

impl From<ContentRank> for ContentMatch {
    fn from(rank: ContentRank) -> Self {
        match rank {
            ContentRank::Identical => ContentMatch::Identical,
            ContentRank::Unverified => ContentMatch::Unverified,
            ContentRank::Different => ContentMatch::Different,
        }
    }
}

impl From<VersionRank> for VersionStatus {
    fn from(rank: VersionRank) -> Self {
        match rank {
            VersionRank::Same => VersionStatus::Same,
            VersionRank::Diverged => VersionStatus::Diverged,
            VersionRank::Phantom => VersionStatus::Phantom,
        }
    }
}

impl fmt::Display for ContentMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContentMatch::Identical => "identical",
            ContentMatch::Unverified => "unverified",
            ContentMatch::Different => "different",
            ContentMatch::Symlink => "symlink",
            ContentMatch::MixedType => "mixed-type",
        };
        f.write_str(s)
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VersionStatus::Same => "same",
            VersionStatus::Diverged => "diverged",
            VersionStatus::Phantom => "phantom",
            VersionStatus::TargetIdentical => "target-identical",
            VersionStatus::TargetDiverged => "target-diverged",
            VersionStatus::Conflict => "conflict",
        };
        f.write_str(s)
    }
}

/// Outcome of comparing two records from different directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PairVerdict {
    Content(ContentVerdict),
    Symlink { targets_match: bool },
    /// One side is a symlink, the other a regular file.
    MixedType,
}

impl PairVerdict {
    pub fn content_match(&self) -> ContentMatch {
        match self {
            PairVerdict::Content(v) => v.content().into(),
            PairVerdict::Symlink { .. } => ContentMatch::Symlink,
            PairVerdict::MixedType => ContentMatch::MixedType,
        }
    }

    pub fn version_status(&self) -> VersionStatus {
        match self {
            PairVerdict::Content(v) => v.version().into(),
            PairVerdict::Symlink { targets_match: true } => VersionStatus::TargetIdentical,
            PairVerdict::Symlink { targets_match: false } => VersionStatus::TargetDiverged,
            PairVerdict::MixedType => VersionStatus::Conflict,
        }
    }
}

/// Timestamps within `fuzz` seconds count as the same. Two unknown times agree
/// with each other and with nothing else.
pub fn mtimes_agree(a: Option<f64>, b: Option<f64>, fuzz: f64) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => (a - b).abs() <= fuzz,
        (None, None) => true,
        _ => false,
    }
}

/// Compare two candidate records. `None` means the pair is not comparable
/// (name or size differ); callers pre-filter by match key so this only guards.
///
/// Digest failures degrade to the metadata-only verdict.
pub fn classify(
    a: &FileRecord,
    b: &FileRecord,
    options: &MatchOptions,
    digest: &dyn ContentDigest,
) -> Option<PairVerdict> {
    let size = match (&a.kind, &b.kind) {
        (EntryKind::Symlink { .. }, EntryKind::Regular { .. })
        | (EntryKind::Regular { .. }, EntryKind::Symlink { .. }) => {
            return Some(PairVerdict::MixedType)
        }
        (EntryKind::Symlink { target: ta }, EntryKind::Symlink { target: tb }) => {
            let targets_match = matches!((ta, tb), (Some(ta), Some(tb)) if ta == tb);
            return Some(PairVerdict::Symlink { targets_match });
        }
        (EntryKind::Regular { size: sa }, EntryKind::Regular { size: sb }) => {
            if a.name_key != b.name_key || sa != sb {
                return None;
            }
            *sa
        }
    };

    let mtime_same = mtimes_agree(a.mod_time, b.mod_time, options.mtime_fuzz_seconds);

    // No bytes, nothing to version: timestamp skew on empty files is sync noise.
    if size == 0 {
        return Some(PairVerdict::Content(ContentVerdict::IDENTICAL_SAME));
    }

    if !options.use_checksum {
        return Some(PairVerdict::Content(ContentVerdict::metadata_only(mtime_same)));
    }

    let verdict = match (digest.digest(&a.abs_path), digest.digest(&b.abs_path)) {
        (Ok(ha), Ok(hb)) => ContentVerdict::digested(ha == hb, mtime_same),
        _ => ContentVerdict::metadata_only(mtime_same),
    };
    Some(PairVerdict::Content(verdict))
}
