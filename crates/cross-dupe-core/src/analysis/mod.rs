pub mod classify;
pub mod folders;
pub mod groups;
pub mod index;
pub mod rollup;
pub mod summary;

pub use classify::{classify, ContentMatch, ContentRank, ContentVerdict, PairVerdict, VersionRank, VersionStatus};
pub use folders::{analyze_folders, FolderAnalysis, FolderComparison, FolderRelationship};
pub use groups::{aggregate, Aggregation, Group, GroupVerdict, SymlinkEntry};
pub use index::{CandidateIndex, KeySize, MatchKey};
pub use rollup::SubtreeStatus;
pub use summary::{PairCount, RunSummary};

/// Every unordered pair of indices below `n`, in order.
pub fn index_pairs(n: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..n).flat_map(move |i| ((i + 1)..n).map(move |j| (i, j)))
}
