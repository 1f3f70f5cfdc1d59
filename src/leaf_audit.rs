use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::commentary::{CommentaryIndex, HeadingRef};
use crate::outline::{Crumb, HierarchyIndex, Leaf};
use crate::reference::VerseRef;
use crate::title::normalize_lenient;


const INCONSISTENCY_SAMPLE_LIMIT: usize = 5;
const MISASSIGNED_SAMPLE_LIMIT: usize = 8;
const AMBIGUOUS_SAMPLE_LIMIT: usize = 5;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafClassification {
    ExpectedEmpty,
    IndexInconsistency,
    SuspiciousMisassigned,
    AmbiguousEmpty,
}

impl LeafClassification {
    pub const REPORT_ORDER: [LeafClassification; 4] = [
        Self::SuspiciousMisassigned,
        Self::AmbiguousEmpty,
        Self::ExpectedEmpty,
        Self::IndexInconsistency,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::ExpectedEmpty => "Expected Empty",
            Self::IndexInconsistency => "Index Inconsistency",
            Self::SuspiciousMisassigned => "Suspicious Misassigned",
            Self::AmbiguousEmpty => "Ambiguous Empty",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleRef {
    #[serde(rename = "ref")]
    pub verse_ref: VerseRef,
    pub current_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeafVerdict {
    pub classification: LeafClassification,
    pub reason: String,
    pub sample_refs: Vec<SampleRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeafFinding {
    pub path: String,
    pub title: String,
    pub chain: Vec<Crumb>,
    #[serde(flatten)]
    pub verdict: LeafVerdict,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LeafAuditCounts {
    pub total_leaves: usize,
    pub empty_leaves: usize,
    pub suspicious_misassigned: usize,
    pub ambiguous_empty: usize,
    pub expected_empty: usize,
    pub index_inconsistency: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeafAudit {
    pub counts: LeafAuditCounts,
    pub results: Vec<LeafFinding>,
}

impl LeafAudit {
    pub fn with_classification(
        &self,
        classification: LeafClassification,
    ) -> impl Iterator<Item = &LeafFinding> {
        self.results
            .iter()
            .filter(move |finding| finding.verdict.classification == classification)
    }
}

/// Everything the decision list needs to know about one empty leaf.
pub struct LeafEvidence<'a> {
    pub leaf: &'a Leaf,
    pub candidates: Vec<&'a HeadingRef>,
    pub current_path: &'a BTreeMap<VerseRef, String>,
    pub commentary: &'a CommentaryIndex,
}

impl LeafEvidence<'_> {
    fn current_path_of(&self, verse_ref: &VerseRef) -> Option<String> {
        self.current_path.get(verse_ref).cloned()
    }

    fn ancestor_keys(&self) -> Vec<String> {
        self.leaf
            .ancestors()
            .iter()
            .map(|crumb| normalize_lenient(&crumb.title))
            .filter(|key| !key.is_empty())
            .collect()
    }
}

type LeafRule = fn(&LeafEvidence<'_>) -> Option<LeafVerdict>;

const LEAF_RULES: [LeafRule; 4] = [
    no_candidate_heading,
    canonical_path_points_here,
    ancestor_context_matches,
    heading_without_context,
];

pub fn audit_leaves(hierarchy: &HierarchyIndex, commentary: &CommentaryIndex) -> LeafAudit {
    let mut counts = LeafAuditCounts {
        total_leaves: hierarchy.leaves.len(),
        ..LeafAuditCounts::default()
    };
    let mut results = Vec::new();

    for leaf in hierarchy.empty_leaves() {
        let evidence = LeafEvidence {
            leaf,
            candidates: candidate_refs(leaf, commentary),
            current_path: &hierarchy.current_path,
            commentary,
        };
        let verdict = classify_leaf(&evidence);

        counts.empty_leaves += 1;
        match verdict.classification {
            LeafClassification::ExpectedEmpty => counts.expected_empty += 1,
            LeafClassification::IndexInconsistency => counts.index_inconsistency += 1,
            LeafClassification::SuspiciousMisassigned => counts.suspicious_misassigned += 1,
            LeafClassification::AmbiguousEmpty => counts.ambiguous_empty += 1,
        }

        results.push(LeafFinding {
            path: leaf.path.clone(),
            title: leaf.title.clone(),
            chain: leaf.chain.clone(),
            verdict,
        });
    }

    LeafAudit { counts, results }
}

pub fn classify_leaf(evidence: &LeafEvidence<'_>) -> LeafVerdict {
    LEAF_RULES
        .iter()
        .find_map(|rule| rule(evidence))
        .unwrap_or_else(|| ambiguous_verdict(evidence))
}

pub fn candidate_refs<'a>(leaf: &Leaf, commentary: &'a CommentaryIndex) -> Vec<&'a HeadingRef> {
    commentary
        .refs_by_heading
        .iter()
        .filter(|(heading_key, _)| heading_could_target_leaf(heading_key, &leaf.title_key))
        .flat_map(|(_, rows)| rows.iter())
        .collect()
}

pub fn heading_could_target_leaf(heading_key: &str, leaf_key: &str) -> bool {
    if heading_key.is_empty() || leaf_key.is_empty() {
        return false;
    }

    match heading_key.strip_prefix(leaf_key) {
        Some("") => true,
        Some(rest) => rest.starts_with(", ") || rest.starts_with(" i.e"),
        None => false,
    }
}

fn no_candidate_heading(evidence: &LeafEvidence<'_>) -> Option<LeafVerdict> {
    if !evidence.candidates.is_empty() {
        return None;
    }

    Some(LeafVerdict {
        classification: LeafClassification::ExpectedEmpty,
        reason: "No direct mapping heading found for this leaf title".to_string(),
        sample_refs: Vec::new(),
        match_count: None,
    })
}

fn canonical_path_points_here(evidence: &LeafEvidence<'_>) -> Option<LeafVerdict> {
    let direct = evidence
        .candidates
        .iter()
        .filter(|row| {
            evidence.current_path.get(&row.verse_ref).map(String::as_str)
                == Some(evidence.leaf.path.as_str())
        })
        .collect::<Vec<_>>();

    if direct.is_empty() {
        return None;
    }

    Some(LeafVerdict {
        classification: LeafClassification::IndexInconsistency,
        reason: "verseToPath points here but leaf verses array is empty".to_string(),
        sample_refs: direct
            .iter()
            .take(INCONSISTENCY_SAMPLE_LIMIT)
            .map(|row| SampleRef {
                verse_ref: row.verse_ref,
                current_path: Some(evidence.leaf.path.clone()),
                heading: None,
            })
            .collect(),
        match_count: Some(direct.len()),
    })
}

fn ancestor_context_matches(evidence: &LeafEvidence<'_>) -> Option<LeafVerdict> {
    let ancestor_keys = evidence.ancestor_keys();
    if ancestor_keys.is_empty() {
        return None;
    }

    let conflicts = evidence
        .candidates
        .iter()
        .filter(|row| {
            let context_keys = evidence
                .commentary
                .context_of(&row.verse_ref)
                .iter()
                .map(|heading| normalize_lenient(heading))
                .filter(|key| !key.is_empty())
                .collect::<HashSet<String>>();
            ancestor_keys.iter().any(|key| context_keys.contains(key))
        })
        .collect::<Vec<_>>();

    if conflicts.is_empty() {
        return None;
    }

    Some(LeafVerdict {
        classification: LeafClassification::SuspiciousMisassigned,
        reason: "Mapping refs for this heading exist with matching ancestor context, but are assigned to other leaves".to_string(),
        sample_refs: conflicts
            .iter()
            .take(MISASSIGNED_SAMPLE_LIMIT)
            .map(|row| SampleRef {
                verse_ref: row.verse_ref,
                current_path: evidence.current_path_of(&row.verse_ref),
                heading: Some(row.heading.clone()),
            })
            .collect(),
        match_count: Some(conflicts.len()),
    })
}

fn heading_without_context(evidence: &LeafEvidence<'_>) -> Option<LeafVerdict> {
    Some(ambiguous_verdict(evidence))
}

fn ambiguous_verdict(evidence: &LeafEvidence<'_>) -> LeafVerdict {
    LeafVerdict {
        classification: LeafClassification::AmbiguousEmpty,
        reason: "Matching heading exists but context did not reliably match this leaf".to_string(),
        sample_refs: evidence
            .candidates
            .iter()
            .take(AMBIGUOUS_SAMPLE_LIMIT)
            .map(|row| SampleRef {
                verse_ref: row.verse_ref,
                current_path: evidence.current_path_of(&row.verse_ref),
                heading: None,
            })
            .collect(),
        match_count: None,
    }
}
