use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::cli::AuditArgs;
use crate::commands::{AuditRun, evaluate_args, write_markdown, write_report};
use crate::line_compare::{CompactMismatch, LineComparison, LineComparisonCounts, LineMismatch};

pub const JSON_LINE_MAP_REPORT: &str = "line_section_map_from_json.json";
pub const COMMENTARY_LINE_MAP_REPORT: &str = "line_section_map_from_commentary.json";
pub const MISMATCH_REPORT: &str = "line_section_mismatches.json";
pub const MARKDOWN_REPORT: &str = "line_section_mismatches.md";

const MARKDOWN_HEADING_LIMIT: usize = 3;

#[derive(Serialize)]
struct LineMap<'a, T> {
    line_count: usize,
    lines: &'a [T],
}

#[derive(Serialize)]
struct MismatchBody<'a> {
    counts: &'a LineComparisonCounts,
    compact: &'a [CompactMismatch],
    detailed: &'a [LineMismatch],
}

pub fn run(args: AuditArgs) -> Result<()> {
    let run = evaluate_args(&args)?;
    let counts = &run.outcome.lines.counts;

    if args.dry_run {
        info!(
            compared_lines = counts.compared_lines,
            mismatched_lines = counts.mismatched_lines,
            "line comparison dry-run complete"
        );
        return Ok(());
    }

    write_reports(&args.out_dir, &run)?;
    info!(
        compared_lines = counts.compared_lines,
        mismatched_lines = counts.mismatched_lines,
        compact = counts.compact_mismatches,
        "line comparison completed"
    );
    Ok(())
}

pub fn write_reports(out_dir: &Path, run: &AuditRun) -> Result<Vec<PathBuf>> {
    let comparison = &run.outcome.lines;

    let json_map = run.manifest(
        "line_section_map_from_json",
        LineMap {
            line_count: comparison.canonical_lines.len(),
            lines: &comparison.canonical_lines,
        },
    );
    let commentary_map = run.manifest(
        "line_section_map_from_commentary",
        LineMap {
            line_count: comparison.commentary_lines.len(),
            lines: &comparison.commentary_lines,
        },
    );
    let mismatches = run.manifest(
        "line_section_mismatches",
        MismatchBody {
            counts: &comparison.counts,
            compact: &comparison.compact,
            detailed: &comparison.detailed,
        },
    );

    Ok(vec![
        write_report(out_dir, JSON_LINE_MAP_REPORT, &json_map)?,
        write_report(out_dir, COMMENTARY_LINE_MAP_REPORT, &commentary_map)?,
        write_report(out_dir, MISMATCH_REPORT, &mismatches)?,
        write_markdown(
            out_dir,
            MARKDOWN_REPORT,
            &render_markdown(comparison, &run.generated_at)?,
        )?,
    ])
}

pub fn render_markdown(comparison: &LineComparison, generated_at: &str) -> Result<String> {
    let counts = &comparison.counts;
    let mut md = String::new();

    md.push_str("# Line-Level Section Mismatch Report\n\n");
    writeln!(md, "Generated: {generated_at}\n")?;
    writeln!(md, "- Title matching: {}", comparison.title_match.as_str())?;
    writeln!(md, "- JSON line assignments: {}", counts.json_lines)?;
    writeln!(md, "- Commentary line assignments: {}", counts.commentary_lines)?;
    writeln!(md, "- Mismatched lines: {}", counts.mismatched_lines)?;
    writeln!(md, "- Compact mismatches: {}", counts.compact_mismatches)?;
    md.push_str("\n## Compact Mismatch List\n\n");

    if comparison.compact.is_empty() {
        md.push_str("None.\n");
        return Ok(md);
    }

    for row in &comparison.compact {
        let json_label = match (&row.json_section_path, &row.json_section_title) {
            (Some(path), Some(title)) => format!("{path} | {title}"),
            (Some(path), None) => path.clone(),
            _ => "(missing in JSON)".to_string(),
        };
        let commentary_label = if row.commentary_headings.is_empty() {
            "(missing in commentary)".to_string()
        } else {
            row.commentary_headings
                .iter()
                .take(MARKDOWN_HEADING_LIMIT)
                .map(String::as_str)
                .collect::<Vec<&str>>()
                .join(" || ")
        };

        writeln!(md, "- {}", row.reference)?;
        writeln!(md, "  - Type: {}", row.kind.as_str())?;
        writeln!(md, "  - JSON: {json_label}")?;
        writeln!(md, "  - Commentary: {commentary_label}")?;
    }

    Ok(md)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_compare::MismatchKind;
    use crate::reference::{LineLetter, LineSet, VerseRef};
    use crate::title::TitleMatch;

    fn comparison(compact: Vec<CompactMismatch>) -> LineComparison {
        LineComparison {
            title_match: TitleMatch::Lenient,
            counts: LineComparisonCounts {
                json_lines: 8,
                commentary_lines: 4,
                compact_mismatches: compact.len(),
                ..LineComparisonCounts::default()
            },
            canonical_lines: Vec::new(),
            commentary_lines: Vec::new(),
            compact,
            detailed: Vec::new(),
        }
    }

    #[test]
    fn empty_comparison_renders_none() {
        let md = render_markdown(&comparison(Vec::new()), "2026-01-01T00:00:00Z")
            .expect("markdown should render");
        assert!(md.contains("- JSON line assignments: 8\n"));
        assert!(md.ends_with("## Compact Mismatch List\n\nNone.\n"));
    }

    #[test]
    fn compact_rows_render_labels() {
        let lines = [LineLetter::C, LineLetter::D].into_iter().collect::<LineSet>();
        let rows = vec![
            CompactMismatch {
                reference: VerseRef::with_lines(6, 1, lines),
                verse: VerseRef::whole(6, 1),
                lines: lines.letters().collect(),
                kind: MismatchKind::MissingInCommentary,
                json_section_path: Some("1.3".to_string()),
                json_section_title: Some("1.3. Diligence".to_string()),
                json_source_ref: Some(VerseRef::whole(6, 1)),
                commentary_headings: Vec::new(),
            },
            CompactMismatch {
                reference: VerseRef::whole(7, 2),
                verse: VerseRef::whole(7, 2),
                lines: LineLetter::ALL.to_vec(),
                kind: MismatchKind::MissingInJson,
                json_section_path: None,
                json_section_title: None,
                json_source_ref: None,
                commentary_headings: vec![
                    "1. A".to_string(),
                    "2. B".to_string(),
                    "3. C".to_string(),
                    "4. D".to_string(),
                ],
            },
        ];

        let md = render_markdown(&comparison(rows), "2026-01-01T00:00:00Z")
            .expect("markdown should render");
        assert!(md.contains(
            "- 6.1cd\n  - Type: missing_in_commentary\n  - JSON: 1.3 | 1.3. Diligence\n  - Commentary: (missing in commentary)\n"
        ));
        assert!(md.contains(
            "- 7.2\n  - Type: missing_in_json\n  - JSON: (missing in JSON)\n  - Commentary: 1. A || 2. B || 3. C\n"
        ));
    }
}
