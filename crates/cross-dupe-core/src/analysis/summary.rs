use ahash::AHashSet;
use serde::Serialize;
use std::collections::BTreeMap;

use super::folders::{FolderComparison, FolderRelationship, LabelCount};
use super::groups::Group;
use super::index_pairs;
use crate::scanner::ScannedDirectory;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairCount {
    pub a: String,
    pub b: String,
    pub count: usize,
}

/// Headline numbers derived from the verdict collections.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub total_files: Vec<LabelCount>,
    /// Duplicate groups containing both directories of each pair.
    pub pairwise_counts: Vec<PairCount>,
    /// Duplicate groups spanning every directory.
    pub all_directories_count: usize,
    /// Records per directory that belong to no duplicate group.
    pub unique_counts: Vec<LabelCount>,
    pub relationship_counts: BTreeMap<FolderRelationship, usize>,
}

impl RunSummary {
    pub fn compute(
        dirs: &[ScannedDirectory],
        duplicates: &[Group],
        folders: &[FolderComparison],
    ) -> Self {
        let labels: Vec<&str> = dirs.iter().map(|d| d.label.as_str()).collect();

        let pairwise_counts = index_pairs(labels.len())
            .map(|(i, j)| PairCount {
                a: labels[i].to_string(),
                b: labels[j].to_string(),
                count: duplicates
                    .iter()
                    .filter(|g| g.contains(labels[i]) && g.contains(labels[j]))
                    .count(),
            })
            .collect();

        let all_directories_count = duplicates
            .iter()
            .filter(|g| labels.iter().all(|l| g.contains(l)))
            .count();

        let unique_counts = dirs
            .iter()
            .map(|dir| {
                let duplicated: AHashSet<String> = duplicates
                    .iter()
                    .flat_map(|g| g.copies.iter())
                    .filter(|c| c.label == dir.label)
                    .map(|c| c.rel_path.to_lowercase())
                    .collect();
                LabelCount {
                    label: dir.label.clone(),
                    count: dir
                        .records
                        .iter()
                        .filter(|r| !duplicated.contains(&r.path_key()))
                        .count(),
                }
            })
            .collect();

        let mut relationship_counts = BTreeMap::new();
        for folder in folders {
            *relationship_counts.entry(folder.relationship).or_insert(0) += 1;
        }

        Self {
            total_files: dirs
                .iter()
                .map(|d| LabelCount {
                    label: d.label.clone(),
                    count: d.records.len(),
                })
                .collect(),
            pairwise_counts,
            all_directories_count,
            unique_counts,
            relationship_counts,
        }
    }

    pub fn count_for(&self, a: &str, b: &str) -> Option<usize> {
        self.pairwise_counts
            .iter()
            .find(|p| (p.a == a && p.b == b) || (p.a == b && p.b == a))
            .map(|p| p.count)
    }
}
