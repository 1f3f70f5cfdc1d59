use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::commentary::CommentaryIndex;
use crate::model::{OutlineDocument, SectionNode};
use crate::outline::{HierarchyIndex, compare_paths};
use crate::reference::VerseRef;

#[derive(Debug, Clone, Serialize)]
pub struct BranchWithVerses {
    pub path: String,
    pub title: String,
    pub children: usize,
    pub verses: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicatePath {
    pub path: String,
    pub occurrences: usize,
    pub titles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftRow {
    pub verse: VerseRef,
    pub tree_path: Option<String>,
    pub table_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexDrift {
    pub missing_from_table: Vec<DriftRow>,
    pub missing_from_tree: Vec<DriftRow>,
    pub path_disagreement: Vec<DriftRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionGap {
    pub section_path: String,
    pub before: VerseRef,
    pub after: VerseRef,
    pub intruder: VerseRef,
    pub intruder_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityCounts {
    pub nodes: usize,
    pub branch_with_verses: usize,
    pub duplicate_path: usize,
    pub missing_from_table: usize,
    pub missing_from_tree: usize,
    pub path_disagreement: usize,
    pub non_consecutive: usize,
    pub unparseable_tree_verses: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub counts: IntegrityCounts,
    pub branch_with_verses: Vec<BranchWithVerses>,
    pub duplicate_path: Vec<DuplicatePath>,
    pub index_drift: IndexDrift,
    pub non_consecutive: Vec<SectionGap>,
}

pub fn check_integrity(
    document: &OutlineDocument,
    hierarchy: &HierarchyIndex,
    commentary: &CommentaryIndex,
) -> IntegrityReport {
    let nodes = walk_nodes(&document.sections);

    let branch_with_verses = branches_with_verses(&nodes);
    let duplicate_path = duplicate_paths(&nodes);
    let (tree_paths, unparseable_tree_verses) = tree_verse_paths(&nodes);
    let index_drift = index_drift(&tree_paths, &hierarchy.current_path);
    let non_consecutive = section_gaps(&hierarchy.current_path, commentary);

    let counts = IntegrityCounts {
        nodes: nodes.len(),
        branch_with_verses: branch_with_verses.len(),
        duplicate_path: duplicate_path.len(),
        missing_from_table: index_drift.missing_from_table.len(),
        missing_from_tree: index_drift.missing_from_tree.len(),
        path_disagreement: index_drift.path_disagreement.len(),
        non_consecutive: non_consecutive.len(),
        unparseable_tree_verses,
    };

    IntegrityReport {
        counts,
        branch_with_verses,
        duplicate_path,
        index_drift,
        non_consecutive,
    }
}

/// Pre-order, depth-first, children in document order.
pub fn walk_nodes(sections: &[SectionNode]) -> Vec<&SectionNode> {
    let mut visited = Vec::new();
    let mut stack = sections.iter().rev().collect::<Vec<&SectionNode>>();

    while let Some(node) = stack.pop() {
        visited.push(node);
        stack.extend(node.children.iter().rev());
    }

    visited
}

pub fn branches_with_verses(nodes: &[&SectionNode]) -> Vec<BranchWithVerses> {
    nodes
        .iter()
        .filter(|node| !node.children.is_empty() && !node.verses.is_empty())
        .map(|node| BranchWithVerses {
            path: node.path.clone(),
            title: node.title.clone(),
            children: node.children.len(),
            verses: node.verses.clone(),
        })
        .collect()
}

pub fn duplicate_paths(nodes: &[&SectionNode]) -> Vec<DuplicatePath> {
    let mut by_path = BTreeMap::<&str, Vec<&str>>::new();
    for node in nodes.iter().filter(|node| !node.path.is_empty()) {
        by_path
            .entry(node.path.as_str())
            .or_default()
            .push(node.title.as_str());
    }

    let mut duplicates = by_path
        .into_iter()
        .filter(|(_, titles)| titles.len() > 1)
        .map(|(path, titles)| DuplicatePath {
            path: path.to_string(),
            occurrences: titles.len(),
            titles: titles.into_iter().map(ToOwned::to_owned).collect(),
        })
        .collect::<Vec<DuplicatePath>>();
    duplicates.sort_by(|left, right| compare_paths(&left.path, &right.path));
    duplicates
}

/// Verse to path as the tree itself claims it. A verse listed under several
/// nodes resolves to the last one visited.
pub fn tree_verse_paths(nodes: &[&SectionNode]) -> (BTreeMap<VerseRef, String>, usize) {
    let mut paths = BTreeMap::new();
    let mut unparseable = 0;

    for node in nodes {
        for raw in &node.verses {
            match VerseRef::parse(raw) {
                Some(verse_ref) => {
                    paths.insert(verse_ref, node.path.clone());
                }
                None => {
                    debug!(path = %node.path, verse = %raw, "skipping tree verse that is not a reference");
                    unparseable += 1;
                }
            }
        }
    }

    (paths, unparseable)
}

pub fn index_drift(
    tree_paths: &BTreeMap<VerseRef, String>,
    table_paths: &BTreeMap<VerseRef, String>,
) -> IndexDrift {
    let mut drift = IndexDrift::default();

    for (verse, tree_path) in tree_paths {
        match table_paths.get(verse) {
            None => drift.missing_from_table.push(DriftRow {
                verse: *verse,
                tree_path: Some(tree_path.clone()),
                table_path: None,
            }),
            Some(table_path) if table_path != tree_path => {
                drift.path_disagreement.push(DriftRow {
                    verse: *verse,
                    tree_path: Some(tree_path.clone()),
                    table_path: Some(table_path.clone()),
                })
            }
            Some(_) => {}
        }
    }

    for (verse, table_path) in table_paths {
        if !tree_paths.contains_key(verse) {
            drift.missing_from_tree.push(DriftRow {
                verse: *verse,
                tree_path: None,
                table_path: Some(table_path.clone()),
            });
        }
    }

    drift
}

pub fn section_gaps(
    table_paths: &BTreeMap<VerseRef, String>,
    commentary: &CommentaryIndex,
) -> Vec<SectionGap> {
    let document_order = commentary.cited_refs().copied().collect::<Vec<VerseRef>>();
    let position_of = document_order
        .iter()
        .enumerate()
        .map(|(position, verse_ref)| (*verse_ref, position))
        .collect::<HashMap<VerseRef, usize>>();

    let mut by_section = BTreeMap::<&str, Vec<VerseRef>>::new();
    for (verse_ref, path) in table_paths {
        by_section.entry(path.as_str()).or_default().push(*verse_ref);
    }
    let mut sections = by_section.into_iter().collect::<Vec<_>>();
    sections.sort_by(|left, right| compare_paths(left.0, right.0));

    let mut gaps = Vec::new();
    for (section_path, verses) in sections {
        let placed = verses
            .iter()
            .filter_map(|verse_ref| position_of.get(verse_ref).map(|position| (*verse_ref, *position)))
            .collect::<Vec<(VerseRef, usize)>>();
        if placed.len() < 2 {
            continue;
        }

        for pair in placed.windows(2) {
            let (before, start) = pair[0];
            let (after, end) = pair[1];
            for intruder in &document_order[start + 1..end] {
                let Some(intruder_path) = table_paths.get(intruder) else {
                    continue;
                };
                if intruder_path != section_path {
                    gaps.push(SectionGap {
                        section_path: section_path.to_string(),
                        before,
                        after,
                        intruder: *intruder,
                        intruder_path: intruder_path.clone(),
                    });
                }
            }
        }
    }

    gaps
}
