use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::commentary::CommentaryIndex;
use crate::outline::HierarchyIndex;
use crate::reference::{LineId, LineLetter, LineSet, VerseRef, expand_lines};
use crate::title::TitleMatch;

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Serialize)]
pub struct LineAssignment {
    pub line: LineId,
    pub verse: VerseRef,
    pub line_letter: LineLetter,
    pub section_path: String,
    pub section_title: String,
    pub source_ref: VerseRef,
    pub source_specificity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingCount {
    pub heading: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentaryLine {
    pub line: LineId,
    pub verse: VerseRef,
    pub line_letter: LineLetter,
    pub closest_heading: Option<String>,
    pub headings: Vec<HeadingCount>,
}

impl CommentaryLine {
    pub fn heading_names(&self) -> impl Iterator<Item = &str> {
        self.headings.iter().map(|row| row.heading.as_str())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    MissingInJson,
    MissingInCommentary,
    SectionMismatch,
}

impl MismatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingInJson => "missing_in_json",
            Self::MissingInCommentary => "missing_in_commentary",
            Self::SectionMismatch => "section_mismatch",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LineMismatch {
    pub line: LineId,
    pub verse: VerseRef,
    pub line_letter: LineLetter,
    #[serde(rename = "type")]
    pub kind: MismatchKind,
    pub json_section_path: Option<String>,
    pub json_section_title: Option<String>,
    pub json_source_ref: Option<VerseRef>,
    pub commentary_headings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompactMismatch {
    #[serde(rename = "ref")]
    pub reference: VerseRef,
    pub verse: VerseRef,
    pub lines: Vec<LineLetter>,
    #[serde(rename = "type")]
    pub kind: MismatchKind,
    pub json_section_path: Option<String>,
    pub json_section_title: Option<String>,
    pub json_source_ref: Option<VerseRef>,
    pub commentary_headings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineComparisonCounts {
    pub json_lines: usize,
    pub commentary_lines: usize,
    pub compared_lines: usize,
    pub mismatched_lines: usize,
    pub compact_mismatches: usize,
    pub missing_in_json: usize,
    pub missing_in_commentary: usize,
    pub section_mismatch: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineComparison {
    pub title_match: TitleMatch,
    pub counts: LineComparisonCounts,
    pub canonical_lines: Vec<LineAssignment>,
    pub commentary_lines: Vec<CommentaryLine>,
    pub compact: Vec<CompactMismatch>,
    pub detailed: Vec<LineMismatch>,
}

pub fn canonical_line_map(hierarchy: &HierarchyIndex) -> BTreeMap<LineId, LineAssignment> {
    let mut rows = hierarchy
        .canonical
        .keys()
        .filter(|verse_ref| !verse_ref.line_set().is_empty())
        .filter_map(|verse_ref| Some((*verse_ref, hierarchy.section_of(verse_ref)?)))
        .collect::<Vec<_>>();

    rows.sort_by(|left, right| {
        left.0
            .specificity()
            .cmp(&right.0.specificity())
            .then_with(|| left.0.cmp(&right.0))
    });

    let mut line_map = BTreeMap::new();
    for (source_ref, section) in rows {
        let source_specificity = source_ref.specificity();
        for line in expand_lines(&source_ref) {
            line_map.entry(line).or_insert_with(|| LineAssignment {
                line,
                verse: line.verse_ref(),
                line_letter: line.letter,
                section_path: section.path.clone(),
                section_title: section.title.clone(),
                source_ref,
                source_specificity,
            });
        }
    }
    line_map
}

pub fn commentary_line_map(commentary: &CommentaryIndex) -> BTreeMap<LineId, CommentaryLine> {
    let mut counts = BTreeMap::<LineId, BTreeMap<&str, usize>>::new();
    for occurrence in &commentary.occurrences {
        for line in expand_lines(&occurrence.verse_ref) {
            *counts
                .entry(line)
                .or_default()
                .entry(occurrence.heading.as_str())
                .or_default() += 1;
        }
    }

    counts
        .into_iter()
        .map(|(line, heading_counts)| {
            let mut headings = heading_counts
                .into_iter()
                .map(|(heading, count)| HeadingCount {
                    heading: heading.to_string(),
                    count,
                })
                .collect::<Vec<HeadingCount>>();
            headings.sort_by(|left, right| {
                right
                    .count
                    .cmp(&left.count)
                    .then_with(|| left.heading.cmp(&right.heading))
            });

            let row = CommentaryLine {
                line,
                verse: line.verse_ref(),
                line_letter: line.letter,
                closest_heading: headings.first().map(|row| row.heading.clone()),
                headings,
            };
            (line, row)
        })
        .collect()
}

pub fn compare_lines(
    hierarchy: &HierarchyIndex,
    commentary: &CommentaryIndex,
    title_match: TitleMatch,
) -> LineComparison {
    let canonical = canonical_line_map(hierarchy);
    let commentary_lines = commentary_line_map(commentary);

    let all_lines = canonical
        .keys()
        .chain(commentary_lines.keys())
        .copied()
        .collect::<BTreeSet<LineId>>();

    let mut detailed = Vec::new();
    for line in &all_lines {
        let json_row = canonical.get(line);
        let headings = commentary_lines
            .get(line)
            .map(|row| row.heading_names().map(ToOwned::to_owned).collect())
            .unwrap_or_else(Vec::new);

        let Some(kind) = classify_line(json_row, &headings, title_match) else {
            continue;
        };

        detailed.push(LineMismatch {
            line: *line,
            verse: line.verse_ref(),
            line_letter: line.letter,
            kind,
            json_section_path: json_row.map(|row| row.section_path.clone()),
            json_section_title: json_row.map(|row| row.section_title.clone()),
            json_source_ref: json_row.map(|row| row.source_ref),
            commentary_headings: headings,
        });
    }

    let compact = compact_mismatches(&detailed, title_match);

    let mut counts = LineComparisonCounts {
        json_lines: canonical.len(),
        commentary_lines: commentary_lines.len(),
        compared_lines: all_lines.len(),
        mismatched_lines: detailed.len(),
        compact_mismatches: compact.len(),
        ..LineComparisonCounts::default()
    };
    for mismatch in &detailed {
        match mismatch.kind {
            MismatchKind::MissingInJson => counts.missing_in_json += 1,
            MismatchKind::MissingInCommentary => counts.missing_in_commentary += 1,
            MismatchKind::SectionMismatch => counts.section_mismatch += 1,
        }
    }

    LineComparison {
        title_match,
        counts,
        canonical_lines: canonical.into_values().collect(),
        commentary_lines: commentary_lines.into_values().collect(),
        compact,
        detailed,
    }
}

pub fn classify_line(
    json_row: Option<&LineAssignment>,
    commentary_headings: &[String],
    title_match: TitleMatch,
) -> Option<MismatchKind> {
    match (json_row, commentary_headings.is_empty()) {
        (None, true) => None,
        (None, false) => Some(MismatchKind::MissingInJson),
        (Some(_), true) => Some(MismatchKind::MissingInCommentary),
        (Some(row), false) => {
            let expected = title_match.normalize(&row.section_title);
            let matched = commentary_headings
                .iter()
                .any(|heading| title_match.normalize(heading) == expected);
            (!matched).then_some(MismatchKind::SectionMismatch)
        }
    }
}

type Signature = ((u32, u32), MismatchKind, String, String, Vec<String>);

pub fn compact_mismatches(
    detailed: &[LineMismatch],
    title_match: TitleMatch,
) -> Vec<CompactMismatch> {
    let mut grouped = BTreeMap::<Signature, (LineSet, &LineMismatch)>::new();

    for mismatch in detailed {
        let heading_keys = mismatch
            .commentary_headings
            .iter()
            .map(|heading| title_match.normalize(heading))
            .collect::<BTreeSet<String>>();
        let signature = (
            mismatch.line.verse_key(),
            mismatch.kind,
            mismatch.json_section_path.clone().unwrap_or_default(),
            mismatch.json_section_title.clone().unwrap_or_default(),
            heading_keys.into_iter().collect(),
        );

        grouped
            .entry(signature)
            .or_insert_with(|| (LineSet::default(), mismatch))
            .0
            .insert(mismatch.line_letter);
    }

    let mut compact = grouped
        .into_values()
        .map(|(letters, first)| {
            let verse = first.line.verse_ref();
            let reference = if letters.is_full() {
                verse
            } else {
                VerseRef::with_lines(verse.chapter, verse.verse, letters)
            };

            CompactMismatch {
                reference,
                verse,
                lines: letters.letters().collect(),
                kind: first.kind,
                json_section_path: first.json_section_path.clone(),
                json_section_title: first.json_section_title.clone(),
                json_source_ref: first.json_source_ref,
                commentary_headings: first.commentary_headings.clone(),
            }
        })
        .collect::<Vec<CompactMismatch>>();

    compact.sort_by(|left, right| {
        left.reference
            .cmp(&right.reference)
            .then_with(|| left.kind.cmp(&right.kind))
    });
    compact
}
