use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use crate::cli::AuditArgs;
use crate::commands::{AuditRun, evaluate_args, write_markdown, write_report};
use crate::leaf_audit::{LeafAudit, LeafClassification};

pub const JSON_REPORT: &str = "empty_leaf_audit.json";
pub const MARKDOWN_REPORT: &str = "empty_leaf_audit.md";

pub fn run(args: AuditArgs) -> Result<()> {
    let run = evaluate_args(&args)?;
    let counts = &run.outcome.leaves.counts;

    if args.dry_run {
        info!(
            empty_leaves = counts.empty_leaves,
            suspicious = counts.suspicious_misassigned,
            "leaf audit dry-run complete"
        );
        return Ok(());
    }

    write_reports(&args.out_dir, &run)?;
    info!(
        empty_leaves = counts.empty_leaves,
        suspicious = counts.suspicious_misassigned,
        "leaf audit completed"
    );
    Ok(())
}

pub fn write_reports(out_dir: &Path, run: &AuditRun) -> Result<Vec<PathBuf>> {
    let audit = &run.outcome.leaves;
    let manifest = run.manifest("empty_leaf_audit", audit);

    Ok(vec![
        write_report(out_dir, JSON_REPORT, &manifest)?,
        write_markdown(out_dir, MARKDOWN_REPORT, &render_markdown(audit, &run.generated_at)?)?,
    ])
}

pub fn render_markdown(audit: &LeafAudit, generated_at: &str) -> Result<String> {
    let counts = &audit.counts;
    let mut md = String::new();

    md.push_str("# Empty Leaf Audit\n\n");
    writeln!(md, "Generated: {generated_at}\n")?;
    md.push_str("## Summary\n\n");
    writeln!(md, "- Total leaves: {}", counts.total_leaves)?;
    writeln!(md, "- Empty leaves: {}", counts.empty_leaves)?;
    writeln!(md, "- Suspicious misassigned: {}", counts.suspicious_misassigned)?;
    writeln!(md, "- Ambiguous: {}", counts.ambiguous_empty)?;
    writeln!(md, "- Expected empty: {}", counts.expected_empty)?;
    writeln!(md, "- Index inconsistencies: {}", counts.index_inconsistency)?;
    md.push('\n');

    for classification in LeafClassification::REPORT_ORDER {
        let rows = audit.with_classification(classification).collect::<Vec<_>>();
        writeln!(md, "## {} ({})\n", classification.label(), rows.len())?;

        if rows.is_empty() {
            md.push_str("None.\n\n");
            continue;
        }

        for finding in rows {
            writeln!(md, "- {} | {}", finding.path, finding.title)?;
            writeln!(md, "  - Reason: {}", finding.verdict.reason)?;
            if !finding.verdict.sample_refs.is_empty() {
                let samples = finding
                    .verdict
                    .sample_refs
                    .iter()
                    .map(|sample| match &sample.current_path {
                        Some(path) => format!("{} -> {path}", sample.verse_ref),
                        None => sample.verse_ref.to_string(),
                    })
                    .collect::<Vec<String>>();
                writeln!(md, "  - Sample refs: {}", samples.join(", "))?;
            }
        }
        md.push('\n');
    }

    Ok(md)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaf_audit::{LeafAuditCounts, LeafFinding, LeafVerdict, SampleRef};
    use crate::reference::VerseRef;

    fn audit() -> LeafAudit {
        LeafAudit {
            counts: LeafAuditCounts {
                total_leaves: 4,
                empty_leaves: 1,
                suspicious_misassigned: 1,
                ..LeafAuditCounts::default()
            },
            results: vec![LeafFinding {
                path: "1.2".to_string(),
                title: "1.2. Patience".to_string(),
                chain: Vec::new(),
                verdict: LeafVerdict {
                    classification: LeafClassification::SuspiciousMisassigned,
                    reason: "assigned elsewhere".to_string(),
                    sample_refs: vec![
                        SampleRef {
                            verse_ref: VerseRef::whole(6, 1),
                            current_path: Some("1.3".to_string()),
                            heading: None,
                        },
                        SampleRef {
                            verse_ref: VerseRef::whole(6, 9),
                            current_path: None,
                            heading: None,
                        },
                    ],
                    match_count: Some(2),
                },
            }],
        }
    }

    #[test]
    fn markdown_lists_sections_in_report_order() {
        let md = render_markdown(&audit(), "2026-01-01T00:00:00Z")
            .expect("markdown should render");

        assert!(md.starts_with("# Empty Leaf Audit\n\nGenerated: 2026-01-01T00:00:00Z\n"));
        assert!(md.contains("- Total leaves: 4\n"));
        assert!(md.contains("- 1.2 | 1.2. Patience\n  - Reason: assigned elsewhere\n"));
        assert!(md.contains("  - Sample refs: 6.1 -> 1.3, 6.9\n"));

        let suspicious = md
            .find("## Suspicious Misassigned (1)")
            .expect("suspicious section should render");
        let ambiguous = md
            .find("## Ambiguous Empty (0)\n\nNone.")
            .expect("ambiguous section should render");
        let inconsistency = md
            .find("## Index Inconsistency (0)")
            .expect("inconsistency section should render");
        assert!(suspicious < ambiguous && ambiguous < inconsistency);
    }
}
