use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::reference::{ReferenceParser, VerseRef};
use crate::title::normalize_lenient;


pub const DEFAULT_CONTEXT_WINDOW: usize = 25;

#[derive(Debug, Clone, Serialize)]
pub struct RefOccurrence {
    pub verse_ref: VerseRef,
    pub heading: String,
    pub line_number: usize,
    pub context: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeadingRef {
    pub verse_ref: VerseRef,
    pub heading: String,
}

#[derive(Debug, Clone, Default)]
pub struct CommentaryIndex {
    pub occurrences: Vec<RefOccurrence>,
    pub ref_targets: BTreeMap<VerseRef, usize>,
    pub refs_by_heading: BTreeMap<String, Vec<HeadingRef>>,
    pub unresolved_refs: usize,
    /// Every ref parsed from the transcript, including unresolved ones.
    pub cited: BTreeSet<VerseRef>,
}

impl CommentaryIndex {
    pub fn target(&self, verse_ref: &VerseRef) -> Option<&RefOccurrence> {
        self.ref_targets
            .get(verse_ref)
            .and_then(|position| self.occurrences.get(*position))
    }

    pub fn context_of(&self, verse_ref: &VerseRef) -> &[String] {
        self.target(verse_ref)
            .map(|occurrence| occurrence.context.as_slice())
            .unwrap_or_default()
    }

    pub fn cited_refs(&self) -> impl Iterator<Item = &VerseRef> {
        self.cited.iter()
    }
}

pub struct CommentaryIndexBuilder<'a> {
    parser: &'a ReferenceParser,
    heading: Regex,
    context_window: usize,
}

impl<'a> CommentaryIndexBuilder<'a> {
    pub fn new(parser: &'a ReferenceParser, context_window: usize) -> Result<Self> {
        let heading =
            Regex::new(r"^\d+(?:\.\d+)*\.\s+.+").context("failed to compile heading regex")?;

        Ok(Self {
            parser,
            heading,
            context_window,
        })
    }

    pub fn is_section_heading(&self, line: &str) -> bool {
        self.heading.is_match(line.trim())
    }

    pub fn build(&self, transcript: &str) -> CommentaryIndex {
        let lines = transcript.lines().collect::<Vec<&str>>();
        let headings = lines
            .iter()
            .map(|line| self.is_section_heading(line))
            .collect::<Vec<bool>>();

        let mut index = CommentaryIndex::default();
        let mut current_heading: Option<String> = None;

        for (position, line) in lines.iter().enumerate() {
            if headings[position] {
                current_heading = Some(extract_heading(line));
            }

            let refs = self.parser.parse_line(line);
            if refs.is_empty() {
                continue;
            }
            index.cited.extend(refs.iter().copied());

            let Some(heading) =
                resolve_target(&lines, &headings, position, current_heading.as_deref())
            else {
                debug!(
                    line_number = position + 1,
                    refs = refs.len(),
                    "citation precedes every heading; skipping"
                );
                index.unresolved_refs += refs.len();
                continue;
            };

            let context = self.context_window(&lines, &headings, position);
            for verse_ref in refs {
                index.ref_targets.insert(verse_ref, index.occurrences.len());
                index.occurrences.push(RefOccurrence {
                    verse_ref,
                    heading: heading.clone(),
                    line_number: position + 1,
                    context: context.clone(),
                });
            }
        }

        for (verse_ref, position) in &index.ref_targets {
            let heading = &index.occurrences[*position].heading;
            index
                .refs_by_heading
                .entry(normalize_lenient(heading))
                .or_default()
                .push(HeadingRef {
                    verse_ref: *verse_ref,
                    heading: heading.clone(),
                });
        }

        index
    }

    fn context_window(&self, lines: &[&str], headings: &[bool], position: usize) -> Vec<String> {
        let start = position.saturating_sub(self.context_window);
        (start..position)
            .rev()
            .filter(|candidate| headings[*candidate])
            .map(|candidate| extract_heading(lines[candidate]))
            .collect()
    }
}

fn resolve_target(
    lines: &[&str],
    headings: &[bool],
    position: usize,
    current_heading: Option<&str>,
) -> Option<String> {
    if headings[position] {
        return Some(extract_heading(lines[position]));
    }

    let next_is_heading = headings.get(position + 1).copied().unwrap_or(false);
    let previous_is_heading =
        previous_non_blank(lines, position).is_some_and(|previous| headings[previous]);

    if next_is_heading && previous_is_heading {
        return Some(extract_heading(lines[position + 1]));
    }

    current_heading
        .map(ToOwned::to_owned)
        .or_else(|| nearest_heading_before(lines, headings, position))
}

fn previous_non_blank(lines: &[&str], position: usize) -> Option<usize> {
    (0..position)
        .rev()
        .find(|candidate| !lines[*candidate].trim().is_empty())
}

fn nearest_heading_before(lines: &[&str], headings: &[bool], position: usize) -> Option<String> {
    (0..position)
        .rev()
        .find(|candidate| headings[*candidate])
        .map(|candidate| extract_heading(lines[candidate]))
}

/// Heading text is the trimmed line up to its first colon.
pub fn extract_heading(line: &str) -> String {
    let trimmed = line.trim();
    match trimmed.find(':') {
        Some(colon) if colon > 0 => trimmed[..colon].trim().to_string(),
        _ => trimmed.to_string(),
    }
}
