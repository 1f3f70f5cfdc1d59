use serde_json::json;

use super::*;
use crate::commentary::CommentaryIndexBuilder;
use crate::model::OutlineDocument;
use crate::reference::ReferenceParser;

fn hierarchy(verse_to_path: serde_json::Value) -> HierarchyIndex {
    let document: OutlineDocument = serde_json::from_value(json!({
        "sections": [],
        "verseToPath": verse_to_path
    }))
    .expect("fixture outline should deserialize");
    HierarchyIndex::build(&document)
}

fn commentary(transcript: &str) -> CommentaryIndex {
    let parser = ReferenceParser::new().expect("parser should build");
    CommentaryIndexBuilder::new(&parser, 25)
        .expect("builder should build")
        .build(transcript)
}

fn section(path: &str, title: &str) -> serde_json::Value {
    json!([{ "section": path, "title": title }])
}

fn line(raw: &str) -> LineId {
    let verse_ref = VerseRef::parse(&raw[..raw.len() - 1]).expect("verse should parse");
    let letter = raw
        .chars()
        .last()
        .and_then(LineLetter::from_char)
        .expect("line letter should parse");
    LineId {
        chapter: verse_ref.chapter,
        verse: verse_ref.verse,
        letter,
    }
}

#[test]
fn bracketed_roman_numeral_does_not_cause_false_mismatch() {
    let index = hierarchy(json!({ "6.1": section("1.2", "1.2. Patience") }));
    let comparison = compare_lines(
        &index,
        &commentary("1. Patience [XII]:\n[6.1]\n"),
        TitleMatch::Lenient,
    );

    assert_eq!(comparison.counts.json_lines, 4);
    assert_eq!(comparison.counts.commentary_lines, 4);
    assert_eq!(comparison.counts.mismatched_lines, 0);
    assert!(comparison.compact.is_empty());
}

#[test]
fn most_specific_canonical_entry_owns_each_line() {
    let index = hierarchy(json!({
        "6.1": section("1.3", "1.3. Diligence"),
        "6.1ab": section("1.2", "1.2. Patience")
    }));
    let lines = canonical_line_map(&index);

    let first = &lines[&line("6.1a")];
    assert_eq!(first.section_path, "1.2");
    assert_eq!(first.source_ref.to_string(), "6.1ab");
    assert_eq!(first.source_specificity, 2);

    let third = &lines[&line("6.1c")];
    assert_eq!(third.section_path, "1.3");
    assert_eq!(third.source_specificity, 4);
}

#[test]
fn equal_specificity_falls_back_to_reference_order() {
    let index = hierarchy(json!({
        "6.1bc": section("1.4", "1.4. Later"),
        "6.1ab": section("1.2", "1.2. Earlier")
    }));
    let lines = canonical_line_map(&index);
    assert_eq!(lines[&line("6.1b")].section_path, "1.2");
    assert_eq!(lines[&line("6.1c")].section_path, "1.4");
}

#[test]
fn commentary_headings_are_ranked_by_count() {
    let transcript = "1. First\n[3.1]\nprose\n2. Second\n[3.1a]\nprose\n[3.1ab]\n";
    let lines = commentary_line_map(&commentary(transcript));

    let first_line = &lines[&line("3.1a")];
    assert_eq!(first_line.closest_heading.as_deref(), Some("2. Second"));
    assert_eq!(
        first_line.headings,
        vec![
            HeadingCount {
                heading: "2. Second".to_string(),
                count: 2
            },
            HeadingCount {
                heading: "1. First".to_string(),
                count: 1
            },
        ]
    );
    assert_eq!(
        lines[&line("3.1c")].closest_heading.as_deref(),
        Some("1. First")
    );
}

#[test]
fn every_mismatch_kind_is_detected_and_compacted() {
    let index = hierarchy(json!({ "6.1": section("1.3", "1.3. Diligence") }));
    let comparison = compare_lines(
        &index,
        &commentary("2. Patience\n[6.1ab]\n[7.2]\n"),
        TitleMatch::Lenient,
    );

    assert_eq!(
        comparison.counts,
        LineComparisonCounts {
            json_lines: 4,
            commentary_lines: 6,
            compared_lines: 8,
            mismatched_lines: 8,
            compact_mismatches: 3,
            missing_in_json: 4,
            missing_in_commentary: 2,
            section_mismatch: 2,
        }
    );

    let summary = comparison
        .compact
        .iter()
        .map(|row| (row.reference.to_string(), row.kind))
        .collect::<Vec<_>>();
    assert_eq!(
        summary,
        vec![
            ("6.1ab".to_string(), MismatchKind::SectionMismatch),
            ("6.1cd".to_string(), MismatchKind::MissingInCommentary),
            ("7.2".to_string(), MismatchKind::MissingInJson),
        ]
    );
    assert_eq!(comparison.compact[0].commentary_headings, vec!["2. Patience"]);
    assert_eq!(
        comparison.compact[1].json_section_path.as_deref(),
        Some("1.3")
    );
    assert!(comparison.compact[2].json_section_path.is_none());
}

#[test]
fn strict_matching_ignores_stop_words() {
    let index = hierarchy(json!({ "6.1": section("1.2", "1.2. The Patience") }));
    let transcript = commentary("2. Patience\n[6.1]\n");

    let lenient = compare_lines(&index, &transcript, TitleMatch::Lenient);
    assert_eq!(lenient.counts.section_mismatch, 4);

    let strict = compare_lines(&index, &transcript, TitleMatch::Strict);
    assert_eq!(strict.counts.mismatched_lines, 0);
}

#[test]
fn lines_absent_from_both_sides_are_not_mismatches() {
    assert_eq!(classify_line(None, &[], TitleMatch::Lenient), None);
}

#[test]
fn compact_rows_serialize_with_report_field_names() {
    let index = hierarchy(json!({ "6.1": section("1.3", "1.3. Diligence") }));
    let comparison = compare_lines(
        &index,
        &commentary("2. Patience\n[6.1ab]\n"),
        TitleMatch::Lenient,
    );
    let value = serde_json::to_value(&comparison.compact[0]).expect("row should serialize");

    assert_eq!(value["ref"], "6.1ab");
    assert_eq!(value["type"], "section_mismatch");
    assert_eq!(value["lines"], json!(["a", "b"]));
    assert_eq!(value["json_source_ref"], "6.1");
}

#[test]
fn single_line_scope_beats_whole_verse() {
    let index = hierarchy(json!({
        "9.101": section("4.1", "4.1. Whole"),
        "9.101c": section("4.2", "4.2. Single")
    }));
    let lines = canonical_line_map(&index);

    assert_eq!(lines[&line("9.101c")].section_path, "4.2");
    assert_eq!(lines[&line("9.101c")].source_specificity, 1);
    assert_eq!(lines[&line("9.101d")].section_path, "4.1");
}
