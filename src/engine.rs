use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::commentary::CommentaryIndexBuilder;
use crate::integrity::{IntegrityReport, check_integrity};
use crate::leaf_audit::{LeafAudit, audit_leaves};
use crate::line_compare::{LineComparison, compare_lines};
use crate::model::{AuditSettings, OutlineDocument};
use crate::outline::HierarchyIndex;
use crate::reference::ReferenceParser;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InputStats {
    pub leaves: usize,
    pub canonical_refs: usize,
    pub skipped_canonical_keys: Vec<String>,
    pub transcript_citations: usize,
    pub cited_refs: usize,
    pub unresolved_citations: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditOutcome {
    pub settings: AuditSettings,
    pub inputs: InputStats,
    pub leaves: LeafAudit,
    pub lines: LineComparison,
    pub integrity: IntegrityReport,
}

pub fn evaluate(
    outline: &OutlineDocument,
    transcript: &str,
    settings: &AuditSettings,
) -> Result<AuditOutcome> {
    let parser = ReferenceParser::with_open_range_limit(settings.open_range_limit)?;
    let hierarchy = HierarchyIndex::build(outline);
    let commentary = CommentaryIndexBuilder::new(&parser, settings.context_window)?.build(transcript);

    let inputs = InputStats {
        leaves: hierarchy.leaves.len(),
        canonical_refs: hierarchy.canonical.len(),
        skipped_canonical_keys: hierarchy.skipped_keys.clone(),
        transcript_citations: commentary.occurrences.len(),
        cited_refs: commentary.ref_targets.len(),
        unresolved_citations: commentary.unresolved_refs,
    };
    info!(
        leaves = inputs.leaves,
        canonical_refs = inputs.canonical_refs,
        skipped_keys = inputs.skipped_canonical_keys.len(),
        citations = inputs.transcript_citations,
        unresolved = inputs.unresolved_citations,
        "indexed outline and transcript"
    );

    let leaves = audit_leaves(&hierarchy, &commentary);
    info!(
        empty_leaves = leaves.counts.empty_leaves,
        suspicious = leaves.counts.suspicious_misassigned,
        ambiguous = leaves.counts.ambiguous_empty,
        expected = leaves.counts.expected_empty,
        inconsistent = leaves.counts.index_inconsistency,
        "classified empty leaves"
    );

    let lines = compare_lines(&hierarchy, &commentary, settings.title_match);
    info!(
        compared_lines = lines.counts.compared_lines,
        mismatched_lines = lines.counts.mismatched_lines,
        compact = lines.counts.compact_mismatches,
        title_match = settings.title_match.as_str(),
        "reconciled line sections"
    );

    let integrity = check_integrity(outline, &hierarchy, &commentary);
    info!(
        branch_with_verses = integrity.counts.branch_with_verses,
        duplicate_path = integrity.counts.duplicate_path,
        path_disagreement = integrity.counts.path_disagreement,
        non_consecutive = integrity.counts.non_consecutive,
        "checked outline integrity"
    );

    Ok(AuditOutcome {
        settings: settings.clone(),
        inputs,
        leaves,
        lines,
        integrity,
    })
}
