use serde::Serialize;
use std::fmt;

use super::folders::{DirectComparison, FolderRelationship, FolderTree};

/// Verdict for a folder together with everything beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtreeStatus {
    /// Every shared folder in the subtree is identical.
    Identical,
    /// Some folder differs, but only by subset/superset.
    Partial,
    Overlap,
}

impl fmt::Display for SubtreeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubtreeStatus::Identical => "identical",
            SubtreeStatus::Partial => "partial",
            SubtreeStatus::Overlap => "overlap",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtreeRollup {
    pub status: SubtreeStatus,
    /// Direct file counts summed over the folder and all shared descendants.
    pub total_files: usize,
}

/// Accumulated facts about the shared folders in one subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Acc {
    all_identical: bool,
    any_overlap: bool,
    total_files: usize,
}

impl Acc {
    const EMPTY: Self = Self {
        all_identical: true,
        any_overlap: false,
        total_files: 0,
    };

    fn of(cmp: &DirectComparison) -> Self {
        Self {
            all_identical: cmp.relationship == FolderRelationship::Identical,
            any_overlap: cmp.relationship == FolderRelationship::Overlap,
            total_files: cmp.total_unique_files,
        }
    }

    fn merge(self, other: Self) -> Self {
        Self {
            all_identical: self.all_identical && other.all_identical,
            any_overlap: self.any_overlap || other.any_overlap,
            total_files: self.total_files + other.total_files,
        }
    }

    fn status(&self) -> SubtreeStatus {
        if self.all_identical {
            SubtreeStatus::Identical
        } else if self.any_overlap {
            SubtreeStatus::Overlap
        } else {
            SubtreeStatus::Partial
        }
    }
}

/// Bottom-up rollup over the folder tree. Entries line up with `direct`; only
/// shared folders get a rollup.
pub fn rollup(tree: &FolderTree, direct: &[Option<DirectComparison>]) -> Vec<Option<SubtreeRollup>> {
    let mut acc = vec![Acc::EMPTY; tree.nodes.len()];

    // Children always come after their parent in the arena.
    for id in (0..tree.nodes.len()).rev() {
        let own = direct[id].as_ref().map(Acc::of).unwrap_or(Acc::EMPTY);
        acc[id] = tree.nodes[id]
            .children
            .iter()
            .fold(own, |sum, &child| sum.merge(acc[child]));
    }

    direct
        .iter()
        .zip(&acc)
        .map(|(cmp, acc)| {
            cmp.as_ref().map(|_| SubtreeRollup {
                status: acc.status(),
                total_files: acc.total_files,
            })
        })
        .collect()
}

/// Highest shared folders whose subtree is identical. No returned folder lies
/// beneath another.
pub fn safe_to_delete_roots(tree: &FolderTree, rollups: &[Option<SubtreeRollup>]) -> Vec<usize> {
    let mut roots = Vec::new();
    let mut stack = vec![FolderTree::ROOT];

    while let Some(id) = stack.pop() {
        match rollups[id] {
            Some(SubtreeRollup {
                status: SubtreeStatus::Identical,
                ..
            }) => roots.push(id),
            _ => stack.extend(tree.nodes[id].children.iter().copied()),
        }
    }
    roots
}
