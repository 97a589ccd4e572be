use ahash::AHashMap;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info};

use super::index_pairs;
use super::rollup::{self, SubtreeRollup, SubtreeStatus};
use crate::scanner::{ScannedDirectory, ROOT_FOLDER};

/// How one directory's direct file names relate to another's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairRelation {
    Identical,
    Subset,
    Superset,
    Overlap,
}

impl PairRelation {
    pub fn of(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Self {
        if a == b {
            PairRelation::Identical
        } else if a.is_subset(b) {
            PairRelation::Subset
        } else if a.is_superset(b) {
            PairRelation::Superset
        } else {
            PairRelation::Overlap
        }
    }
}

/// Relationship of a shared folder across every directory holding it, judged
/// on direct children only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FolderRelationship {
    #[serde(rename = "identical")]
    Identical,
    #[serde(rename = "subset/superset")]
    SubsetSuperset,
    #[serde(rename = "overlap")]
    Overlap,
}

impl FolderRelationship {
    pub fn of(sets: &[&BTreeSet<String>]) -> Self {
        let relations: Vec<PairRelation> = index_pairs(sets.len())
            .map(|(i, j)| PairRelation::of(sets[i], sets[j]))
            .collect();

        if relations.iter().all(|r| *r == PairRelation::Identical) {
            FolderRelationship::Identical
        } else if relations.contains(&PairRelation::Overlap) {
            FolderRelationship::Overlap
        } else {
            FolderRelationship::SubsetSuperset
        }
    }
}

impl fmt::Display for FolderRelationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FolderRelationship::Identical => "identical",
            FolderRelationship::SubsetSuperset => "subset/superset",
            FolderRelationship::Overlap => "overlap",
        };
        f.write_str(s)
    }
}

/// A node of the folder tree implied by every scanned record path.
#[derive(Debug, Clone)]
pub struct FolderNode {
    pub path: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Direct file names per directory; `None` where the directory has no
    /// files directly in this folder.
    pub direct: Vec<Option<BTreeSet<String>>>,
    /// Whether each directory has files here or anywhere below.
    pub present: Vec<bool>,
}

impl FolderNode {
    fn new(path: String, parent: Option<usize>, dirs: usize) -> Self {
        Self {
            path,
            parent,
            children: Vec::new(),
            direct: vec![None; dirs],
            present: vec![false; dirs],
        }
    }

    pub fn present_count(&self) -> usize {
        self.present.iter().filter(|p| **p).count()
    }

    pub fn has_direct_files(&self) -> bool {
        self.direct.iter().any(Option::is_some)
    }

    /// Path as reported, with the root shown as [`ROOT_FOLDER`].
    pub fn display_path(&self) -> &str {
        if self.parent.is_none() {
            ROOT_FOLDER
        } else {
            &self.path
        }
    }
}

/// Arena of folder nodes keyed by path. Node 0 is the root, and a parent is
/// always created before its children, so children have larger indices.
#[derive(Debug, Clone)]
pub struct FolderTree {
    pub labels: Vec<String>,
    pub nodes: Vec<FolderNode>,
    index: AHashMap<String, usize>,
}

impl FolderTree {
    pub const ROOT: usize = 0;

    pub fn build(dirs: &[ScannedDirectory]) -> Self {
        let mut tree = Self {
            labels: dirs.iter().map(|d| d.label.clone()).collect(),
            nodes: vec![FolderNode::new(String::new(), None, dirs.len())],
            index: AHashMap::new(),
        };
        tree.index.insert(String::new(), Self::ROOT);

        for (d, dir) in dirs.iter().enumerate() {
            for record in &dir.records {
                let node = tree.ensure(record.folder());
                tree.nodes[node].direct[d]
                    .get_or_insert_with(BTreeSet::new)
                    .insert(record.name_key.clone());
            }
        }

        // Children sit at higher indices than their parents.
        for i in (0..tree.nodes.len()).rev() {
            for d in 0..dirs.len() {
                let present = tree.nodes[i].direct[d].is_some()
                    || tree.nodes[i].children.iter().any(|&c| tree.nodes[c].present[d]);
                tree.nodes[i].present[d] = present;
            }
        }

        debug!("Folder tree has {} nodes", tree.nodes.len());
        tree
    }

    fn ensure(&mut self, path: &str) -> usize {
        if let Some(&id) = self.index.get(path) {
            return id;
        }

        let parent = match path.rsplit_once('/') {
            Some((parent, _)) => self.ensure(parent),
            None => Self::ROOT,
        };
        let id = self.nodes.len();
        self.nodes
            .push(FolderNode::new(path.to_string(), Some(parent), self.labels.len()));
        self.nodes[parent].children.push(id);
        self.index.insert(path.to_string(), id);
        id
    }

    pub fn get(&self, path: &str) -> Option<&FolderNode> {
        self.index.get(path).map(|&id| &self.nodes[id])
    }

    pub fn id(&self, path: &str) -> Option<usize> {
        self.index.get(path).copied()
    }

    /// A folder is compared when two or more directories hold it. The root only
    /// counts as a folder when some directory has files directly in it.
    pub fn is_shared(&self, id: usize) -> bool {
        let node = &self.nodes[id];
        node.present_count() >= 2 && (id != Self::ROOT || node.has_direct_files())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelNames {
    pub label: String,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairNames {
    pub a: String,
    pub b: String,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// Name-level breakdown of a shared folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderDetails {
    pub in_all: Vec<String>,
    /// Names only one directory has, for each directory that has any.
    pub only_in: Vec<LabelNames>,
    /// Names present in exactly two directories, for each pair that shares any.
    pub pair_shared: Vec<PairNames>,
}

impl FolderDetails {
    fn of(labels: &[&str], sets: &[&BTreeSet<String>]) -> (Self, usize) {
        let mut holders: AHashMap<&str, Vec<usize>> = AHashMap::new();
        for (i, set) in sets.iter().enumerate() {
            for name in set.iter() {
                holders.entry(name.as_str()).or_default().push(i);
            }
        }
        let union_size = holders.len();

        let names_held_by = |wanted: &[usize]| -> Vec<String> {
            let mut names: Vec<String> = holders
                .iter()
                .filter(|(_, h)| h.as_slice() == wanted)
                .map(|(n, _)| n.to_string())
                .collect();
            names.sort();
            names
        };

        let all: Vec<usize> = (0..sets.len()).collect();
        let in_all = names_held_by(&all);

        let only_in = (0..sets.len())
            .map(|i| LabelNames {
                label: labels[i].to_string(),
                names: names_held_by(&[i]),
            })
            .filter(|ln| !ln.names.is_empty())
            .collect();

        let pair_shared = if sets.len() > 2 {
            index_pairs(sets.len())
                .map(|(i, j)| PairNames {
                    a: labels[i].to_string(),
                    b: labels[j].to_string(),
                    names: names_held_by(&[i, j]),
                })
                .filter(|pn| !pn.names.is_empty())
                .collect()
        } else {
            Vec::new()
        };

        (
            Self {
                in_all,
                only_in,
                pair_shared,
            },
            union_size,
        )
    }
}

/// Verdict for one folder path present in two or more directories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderComparison {
    pub path: String,
    /// Directories holding files here or below, in input order.
    pub labels: Vec<String>,
    pub relationship: FolderRelationship,
    pub direct_counts: Vec<LabelCount>,
    /// Distinct direct file names across all directories.
    pub total_unique_files: usize,
    pub files_in_all: usize,
    pub details: FolderDetails,
    pub subtree_status: SubtreeStatus,
    pub subtree_total_files: usize,
}

/// Direct-name comparison for a shared folder, before rollup.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectComparison {
    pub labels: Vec<String>,
    pub relationship: FolderRelationship,
    pub direct_counts: Vec<LabelCount>,
    pub total_unique_files: usize,
    pub details: FolderDetails,
}

impl DirectComparison {
    fn of(tree: &FolderTree, node: &FolderNode) -> Self {
        let empty = BTreeSet::new();
        let present: Vec<usize> = (0..tree.labels.len()).filter(|&d| node.present[d]).collect();
        let labels: Vec<&str> = present.iter().map(|&d| tree.labels[d].as_str()).collect();
        let sets: Vec<&BTreeSet<String>> = present
            .iter()
            .map(|&d| node.direct[d].as_ref().unwrap_or(&empty))
            .collect();

        let (details, total_unique_files) = FolderDetails::of(&labels, &sets);
        Self {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            relationship: FolderRelationship::of(&sets),
            direct_counts: labels
                .iter()
                .zip(&sets)
                .map(|(l, s)| LabelCount {
                    label: l.to_string(),
                    count: s.len(),
                })
                .collect(),
            total_unique_files,
            details,
        }
    }
}

/// Direct comparisons for every shared folder, indexed by node id.
pub fn compare_direct(tree: &FolderTree) -> Vec<Option<DirectComparison>> {
    (0..tree.nodes.len())
        .map(|id| {
            tree.is_shared(id)
                .then(|| DirectComparison::of(tree, &tree.nodes[id]))
        })
        .collect()
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FolderAnalysis {
    pub comparisons: Vec<FolderComparison>,
    /// Highest folders whose whole subtree is identical everywhere.
    pub safe_to_delete: Vec<String>,
}

/// Compare every shared folder, roll verdicts up the tree and pick the
/// safe-to-delete roots.
pub fn analyze_folders(dirs: &[ScannedDirectory]) -> FolderAnalysis {
    info!("Analysing folder structure...");
    let tree = FolderTree::build(dirs);
    let direct = compare_direct(&tree);
    let rollups = rollup::rollup(&tree, &direct);

    let mut safe_to_delete: Vec<String> = rollup::safe_to_delete_roots(&tree, &rollups)
        .into_iter()
        .map(|id| tree.nodes[id].display_path().to_string())
        .collect();
    safe_to_delete.sort();

    let mut comparisons: Vec<FolderComparison> = direct
        .into_iter()
        .zip(rollups)
        .enumerate()
        .filter_map(|(id, (cmp, rollup))| {
            let cmp = cmp?;
            let SubtreeRollup { status, total_files } = rollup?;
            Some(FolderComparison {
                path: tree.nodes[id].display_path().to_string(),
                labels: cmp.labels,
                relationship: cmp.relationship,
                direct_counts: cmp.direct_counts,
                total_unique_files: cmp.total_unique_files,
                files_in_all: cmp.details.in_all.len(),
                details: cmp.details,
                subtree_status: status,
                subtree_total_files: total_files,
            })
        })
        .collect();
    comparisons.sort_by(|a, b| a.path.cmp(&b.path));

    debug!(
        "{} shared folders, {} safe-to-delete roots",
        comparisons.len(),
        safe_to_delete.len()
    );
    FolderAnalysis {
        comparisons,
        safe_to_delete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::FileRecord;
    use std::path::Path;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn dir(label: &str, paths: &[&str]) -> ScannedDirectory {
        let root = format!("/{}", label);
        let records = paths
            .iter()
            .map(|p| FileRecord::regular(Path::new(&root), p, 1, Some(1.0)))
            .collect();
        ScannedDirectory::new(label, root, records)
    }

    #[test]
    fn test_pair_relations() {
        assert_eq!(PairRelation::of(&set(&["a"]), &set(&["a"])), PairRelation::Identical);
        assert_eq!(PairRelation::of(&set(&["a"]), &set(&["a", "b"])), PairRelation::Subset);
        assert_eq!(PairRelation::of(&set(&["a", "b"]), &set(&["a"])), PairRelation::Superset);
        assert_eq!(PairRelation::of(&set(&["a"]), &set(&["b"])), PairRelation::Overlap);
        assert_eq!(PairRelation::of(&set(&[]), &set(&[])), PairRelation::Identical);
    }

    #[test]
    fn test_folder_relationship() {
        let a = set(&["x", "y"]);
        let b = set(&["x"]);
        let c = set(&["x", "z"]);
        assert_eq!(FolderRelationship::of(&[&a, &a, &a]), FolderRelationship::Identical);
        assert_eq!(FolderRelationship::of(&[&a, &b]), FolderRelationship::SubsetSuperset);
        assert_eq!(FolderRelationship::of(&[&a, &b, &a]), FolderRelationship::SubsetSuperset);
        assert_eq!(FolderRelationship::of(&[&a, &b, &c]), FolderRelationship::Overlap);
    }

    #[test]
    fn test_tree_synthesizes_ancestors_but_not_root() {
        let dirs = vec![
            dir("A", &["photos/2020/jan.jpg"]),
            dir("B", &["photos/2020/jan.jpg"]),
        ];
        let tree = FolderTree::build(&dirs);
        let photos = tree.id("photos").unwrap();
        assert!(tree.nodes[photos].present.iter().all(|p| *p));
        assert!(!tree.nodes[photos].has_direct_files());
        assert!(tree.is_shared(photos));
        assert!(!tree.is_shared(FolderTree::ROOT));
        assert_eq!(tree.nodes[tree.id("photos/2020").unwrap()].parent, Some(photos));
    }

    #[test]
    fn test_presence_through_descendants() {
        let dirs = vec![
            dir("A", &["top.txt", "docs/a.txt"]),
            dir("B", &["docs/deep/b.txt"]),
        ];
        let tree = FolderTree::build(&dirs);
        let docs = tree.get("docs").unwrap();
        assert_eq!(docs.present, vec![true, true]);
        assert!(tree.is_shared(FolderTree::ROOT));

        let direct = compare_direct(&tree);
        let root = direct[FolderTree::ROOT].as_ref().unwrap();
        // B is present at the root only through descendants: empty direct set.
        assert_eq!(root.relationship, FolderRelationship::SubsetSuperset);
        assert_eq!(root.direct_counts[1].count, 0);
    }

    #[test]
    fn test_folder_named_like_root_stays_separate() {
        let files = ["top.txt", "(root)/inner.txt"];
        let dirs = vec![dir("A", &files), dir("B", &files)];
        let tree = FolderTree::build(&dirs);

        let named = tree.id("(root)").unwrap();
        assert_ne!(named, FolderTree::ROOT);
        assert_eq!(tree.nodes[named].parent, Some(FolderTree::ROOT));
        assert_eq!(tree.nodes[FolderTree::ROOT].direct[0], Some(set(&["top.txt"])));
        assert_eq!(tree.nodes[named].direct[0], Some(set(&["inner.txt"])));

        let analysis = analyze_folders(&dirs);
        assert_eq!(analysis.comparisons.len(), 2);
        assert!(analysis.comparisons.iter().all(|c| c.path == ROOT_FOLDER));
        assert!(analysis.comparisons.iter().all(|c| c.total_unique_files == 1));
    }

    #[test]
    fn test_details_for_three_directories() {
        let dirs = vec![
            dir("A", &["f/common.txt", "f/ab.txt", "f/a.txt", "f/abc_only_a_b.txt"]),
            dir("B", &["f/common.txt", "f/ab.txt", "f/bc.txt", "f/abc_only_a_b.txt"]),
            dir("C", &["f/common.txt", "f/bc.txt", "f/c.txt"]),
        ];
        let analysis = analyze_folders(&dirs);
        let f = analysis.comparisons.iter().find(|c| c.path == "f").unwrap();

        assert_eq!(f.relationship, FolderRelationship::Overlap);
        assert_eq!(f.labels, vec!["A", "B", "C"]);
        assert_eq!(f.details.in_all, vec!["common.txt"]);
        assert_eq!(f.files_in_all, 1);
        assert_eq!(f.total_unique_files, 6);
        assert_eq!(
            f.details.only_in,
            vec![
                LabelNames { label: "A".into(), names: vec!["a.txt".into()] },
                LabelNames { label: "C".into(), names: vec!["c.txt".into()] },
            ]
        );
        assert_eq!(
            f.details.pair_shared,
            vec![
                PairNames {
                    a: "A".into(),
                    b: "B".into(),
                    names: vec!["ab.txt".into(), "abc_only_a_b.txt".into()],
                },
                PairNames { a: "B".into(), b: "C".into(), names: vec!["bc.txt".into()] },
            ]
        );
    }

    #[test]
    fn test_folder_in_one_directory_is_not_compared() {
        let dirs = vec![dir("A", &["solo/x.txt", "both/y.txt"]), dir("B", &["both/y.txt"])];
        let analysis = analyze_folders(&dirs);
        let paths: Vec<&str> = analysis.comparisons.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["both"]);
    }

    #[test]
    fn test_names_compare_case_insensitively() {
        let dirs = vec![dir("A", &["m/Song.MP3"]), dir("B", &["m/song.mp3"])];
        let analysis = analyze_folders(&dirs);
        assert_eq!(analysis.comparisons[0].relationship, FolderRelationship::Identical);
    }
}
