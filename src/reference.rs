use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use serde::{Serialize, Serializer};
use tracing::debug;

#[cfg(test)]
mod tests;

pub const DEFAULT_OPEN_RANGE_LIMIT: u32 = 999;

// Upper bound on verses one range token may synthesize.
const MAX_SPAN_VERSES: u64 = 100_000;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LineLetter {
    A,
    B,
    C,
    D,
}

impl LineLetter {
    pub const ALL: [LineLetter; 4] = [Self::A, Self::B, Self::C, Self::D];

    pub fn from_char(ch: char) -> Option<Self> {
        match ch.to_ascii_lowercase() {
            'a' => Some(Self::A),
            'b' => Some(Self::B),
            'c' => Some(Self::C),
            'd' => Some(Self::D),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::A => 'a',
            Self::B => 'b',
            Self::C => 'c',
            Self::D => 'd',
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl Serialize for LineLetter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(self.as_char())
    }
}

/// Subset of the four lines of a verse.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct LineSet(u8);

impl LineSet {
    pub const FULL: LineSet = LineSet(0b1111);

    pub fn single(letter: LineLetter) -> Self {
        Self(letter.bit())
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        if suffix.is_empty() {
            return None;
        }

        let mut set = Self::default();
        for ch in suffix.chars() {
            set.insert(LineLetter::from_char(ch)?);
        }
        Some(set)
    }

    pub fn insert(&mut self, letter: LineLetter) {
        self.0 |= letter.bit();
    }

    pub fn contains(self, letter: LineLetter) -> bool {
        self.0 & letter.bit() != 0
    }

    pub fn letters(self) -> impl Iterator<Item = LineLetter> {
        LineLetter::ALL
            .into_iter()
            .filter(move |letter| self.contains(*letter))
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_full(self) -> bool {
        self.0 & Self::FULL.0 == Self::FULL.0
    }

    pub fn suffix(self) -> String {
        self.letters().map(LineLetter::as_char).collect()
    }
}

impl FromIterator<LineLetter> for LineSet {
    fn from_iter<I: IntoIterator<Item = LineLetter>>(iter: I) -> Self {
        let mut set = Self::default();
        for letter in iter {
            set.insert(letter);
        }
        set
    }
}

/// A verse, optionally narrowed to some of its lines. `lines: None` is the
/// whole verse.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct VerseRef {
    pub chapter: u32,
    pub verse: u32,
    pub lines: Option<LineSet>,
}

impl VerseRef {
    pub fn whole(chapter: u32, verse: u32) -> Self {
        Self {
            chapter,
            verse,
            lines: None,
        }
    }

    pub fn with_lines(chapter: u32, verse: u32, lines: LineSet) -> Self {
        Self {
            chapter,
            verse,
            lines: Some(lines),
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let (chapter_raw, rest) = raw.trim().split_once('.')?;
        let digits_end = rest
            .find(|ch: char| !ch.is_ascii_digit())
            .unwrap_or(rest.len());
        let (verse_raw, suffix) = rest.split_at(digits_end);

        let chapter = parse_number(chapter_raw)?;
        let verse = parse_number(verse_raw)?;
        let lines = if suffix.is_empty() {
            None
        } else {
            Some(LineSet::from_suffix(suffix)?)
        };

        Some(Self {
            chapter,
            verse,
            lines,
        })
    }

    pub fn verse_key(&self) -> (u32, u32) {
        (self.chapter, self.verse)
    }

    pub fn line_set(&self) -> LineSet {
        self.lines.unwrap_or(LineSet::FULL)
    }

    pub fn specificity(&self) -> usize {
        self.line_set().len()
    }
}

impl Ord for VerseRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.verse_key()
            .cmp(&other.verse_key())
            .then_with(|| match (self.lines, other.lines) {
                (Some(left), Some(right)) => left.letters().cmp(right.letters()),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    }
}

impl PartialOrd for VerseRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VerseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.chapter, self.verse)?;
        if let Some(lines) = self.lines {
            f.write_str(&lines.suffix())?;
        }
        Ok(())
    }
}

impl Serialize for VerseRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One atomic line: a verse plus one of its four letters.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId {
    pub chapter: u32,
    pub verse: u32,
    pub letter: LineLetter,
}

impl LineId {
    pub fn verse_ref(&self) -> VerseRef {
        VerseRef::whole(self.chapter, self.verse)
    }

    pub fn verse_key(&self) -> (u32, u32) {
        (self.chapter, self.verse)
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.chapter, self.verse, self.letter.as_char())
    }
}

impl Serialize for LineId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub fn expand_lines(verse_ref: &VerseRef) -> Vec<LineId> {
    verse_ref
        .line_set()
        .letters()
        .map(|letter| LineId {
            chapter: verse_ref.chapter,
            verse: verse_ref.verse,
            letter,
        })
        .collect()
}

pub fn interpolate_letters(start_suffix: &str, end_suffix: &str) -> Vec<LineLetter> {
    let start = start_suffix
        .chars()
        .next()
        .and_then(LineLetter::from_char)
        .unwrap_or(LineLetter::A);
    let end = end_suffix
        .chars()
        .last()
        .and_then(LineLetter::from_char)
        .unwrap_or(LineLetter::D);

    LineLetter::ALL
        .into_iter()
        .filter(|letter| *letter >= start && *letter <= end)
        .collect()
}

pub struct ReferenceParser {
    bracketed: Regex,
    bare: Regex,
    open_range_limit: u32,
}

impl ReferenceParser {
    #[cfg(test)]
    pub fn new() -> Result<Self> {
        Self::with_open_range_limit(DEFAULT_OPEN_RANGE_LIMIT)
    }

    pub fn with_open_range_limit(open_range_limit: u32) -> Result<Self> {
        let bracketed = Regex::new(r"(?i)\[(\d+)\.(\d+)([a-d]*)(?:-(\d+)\.(\d+)([a-d]*))?\]")
            .context("failed to compile bracketed citation regex")?;
        let bare = Regex::new(r"(?i)^(\d+)\.(\d+)([a-d]*)(?:-(\d+)\.(\d+)([a-d]*))?$")
            .context("failed to compile bare citation regex")?;

        Ok(Self {
            bracketed,
            bare,
            open_range_limit,
        })
    }

    pub fn parse_line(&self, line: &str) -> Vec<VerseRef> {
        let mut refs = Vec::new();
        let mut seen = HashSet::new();

        let bracketed = self.bracketed.captures_iter(line);
        let bare = self.bare.captures(line.trim());

        for captures in bracketed.chain(bare) {
            for verse_ref in self.citation_refs(&captures) {
                if seen.insert(verse_ref) {
                    refs.push(verse_ref);
                }
            }
        }

        refs
    }

    fn citation_refs(&self, captures: &Captures<'_>) -> Vec<VerseRef> {
        let Some((chapter, verse)) = capture_pair(captures, 1, 2) else {
            debug!(token = %&captures[0], "skipping citation with out-of-range numbers");
            return Vec::new();
        };
        let start_suffix = captures.get(3).map_or("", |value| value.as_str());

        if captures.get(4).is_none() {
            let lines = LineSet::from_suffix(start_suffix);
            return vec![VerseRef {
                chapter,
                verse,
                lines,
            }];
        }

        let Some((end_chapter, end_verse)) = capture_pair(captures, 4, 5) else {
            debug!(token = %&captures[0], "skipping range with out-of-range numbers");
            return Vec::new();
        };
        let end_suffix = captures.get(6).map_or("", |value| value.as_str());

        let same_verse = chapter == end_chapter && verse == end_verse;
        if same_verse && !(start_suffix.is_empty() && end_suffix.is_empty()) {
            return interpolate_letters(start_suffix, end_suffix)
                .into_iter()
                .map(|letter| VerseRef::with_lines(chapter, verse, LineSet::single(letter)))
                .collect();
        }

        if !self.span_is_bounded((chapter, verse), (end_chapter, end_verse)) {
            debug!(
                token = %&captures[0],
                open_range_limit = self.open_range_limit,
                "skipping range that exceeds the open-range limit"
            );
            return Vec::new();
        }

        self.span_verses((chapter, verse), (end_chapter, end_verse))
    }

    fn span_is_bounded(&self, start: (u32, u32), end: (u32, u32)) -> bool {
        let limit = self.open_range_limit;
        if start.1 > limit || end.1 > limit {
            return false;
        }

        let chapters = u64::from(end.0.saturating_sub(start.0)) + 1;
        chapters.saturating_mul(u64::from(limit)) <= MAX_SPAN_VERSES
    }

    fn span_verses(&self, start: (u32, u32), end: (u32, u32)) -> Vec<VerseRef> {
        let (start_chapter, start_verse) = start;
        let (end_chapter, end_verse) = end;

        let mut refs = Vec::new();
        for chapter in start_chapter..=end_chapter {
            let first = if chapter == start_chapter {
                start_verse
            } else {
                1
            };
            let last = if chapter == end_chapter {
                end_verse
            } else {
                self.open_range_limit
            };
            refs.extend((first..=last).map(|verse| VerseRef::whole(chapter, verse)));
        }
        refs
    }
}

fn capture_pair(captures: &Captures<'_>, first: usize, second: usize) -> Option<(u32, u32)> {
    let left = parse_number(captures.get(first)?.as_str())?;
    let right = parse_number(captures.get(second)?.as_str())?;
    Some((left, right))
}

fn parse_number(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u32>().ok()
}
