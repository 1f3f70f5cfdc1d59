use super::*;

fn parser() -> ReferenceParser {
    ReferenceParser::new().expect("citation regexes should compile")
}

fn rendered(refs: &[VerseRef]) -> Vec<String> {
    refs.iter().map(ToString::to_string).collect()
}

#[test]
fn bracketed_single_reference_keeps_letter_subset() {
    let refs = parser().parse_line("Opening [9.101] then [9.102ab] in prose");
    assert_eq!(rendered(&refs), vec!["9.101", "9.102ab"]);
    assert_eq!(refs[1].lines, LineSet::from_suffix("ab"));
}

#[test]
fn cross_verse_range_expands_to_whole_verses_and_twelve_lines() {
    let refs = parser().parse_line("[9.95-9.97]");
    assert_eq!(rendered(&refs), vec!["9.95", "9.96", "9.97"]);

    let lines = refs.iter().flat_map(expand_lines).collect::<Vec<LineId>>();
    assert_eq!(lines.len(), 12);
    assert!(
        lines
            .iter()
            .all(|line| LineLetter::ALL.contains(&line.letter))
    );
}

#[test]
fn bare_letter_range_within_one_verse_covers_the_full_verse() {
    let refs = parser().parse_line("  9.101ab-9.101cd  ");
    assert_eq!(rendered(&refs), vec!["9.101a", "9.101b", "9.101c", "9.101d"]);
}

#[test]
fn letter_range_defaults_missing_bounds_to_alphabet_edges() {
    let refs = parser().parse_line("[4.12-4.12c]");
    assert_eq!(rendered(&refs), vec!["4.12a", "4.12b", "4.12c"]);

    let refs = parser().parse_line("[4.12b-4.12]");
    assert_eq!(rendered(&refs), vec!["4.12b", "4.12c", "4.12d"]);
}

#[test]
fn inverted_letter_range_yields_nothing() {
    assert!(parser().parse_line("[4.12d-4.12a]").is_empty());
}

#[test]
fn cross_chapter_range_uses_open_range_limit_for_start_chapter() {
    let parser = ReferenceParser::with_open_range_limit(5).expect("parser should build");
    let refs = parser.parse_line("[1.4-3.2]");
    assert_eq!(
        rendered(&refs),
        vec!["1.4", "1.5", "2.1", "2.2", "2.3", "2.4", "2.5", "3.1", "3.2"]
    );
}

#[test]
fn ranges_past_the_open_range_limit_are_skipped() {
    let parser = parser();
    assert!(parser.parse_line("see [1.1-1.5000000] typo").is_empty());
    assert!(parser.parse_line("[1.1-4000000000.1]").is_empty());
    assert!(parser.parse_line("[1.1-30000.1]").is_empty());
    assert!(parser.parse_line("[1.1000-2.1]").is_empty());

    let refs = parser.parse_line("[1.1-1.5000000] but [2.3-2.4]");
    assert_eq!(rendered(&refs), vec!["2.3", "2.4"]);

    let limited = ReferenceParser::with_open_range_limit(5).expect("parser should build");
    assert!(limited.parse_line("[1.2-1.6]").is_empty());
    assert_eq!(limited.parse_line("[1.2-1.5]").len(), 4);
}

#[test]
fn multi_chapter_ranges_within_the_cap_still_expand() {
    let refs = parser().parse_line("[1.998-3.1]");
    assert_eq!(refs.len(), 2 + 999 + 1);
    assert_eq!(refs.first().map(ToString::to_string).as_deref(), Some("1.998"));
    assert_eq!(refs.last().map(ToString::to_string).as_deref(), Some("3.1"));
}

#[test]
fn bare_reference_must_occupy_the_whole_line() {
    let parser = parser();
    assert_eq!(rendered(&parser.parse_line("6.36ab")), vec!["6.36ab"]);
    assert!(parser.parse_line("see 6.36 for details").is_empty());
    assert!(parser.parse_line("2. Fear of experiencing this").is_empty());
}

#[test]
fn repeated_citations_on_one_line_are_reported_once() {
    let refs = parser().parse_line("[1.1] and again [1.1] and [1.2]");
    assert_eq!(rendered(&refs), vec!["1.1", "1.2"]);
}

#[test]
fn uppercase_letters_are_accepted() {
    let refs = parser().parse_line("[2.7AB]");
    assert_eq!(rendered(&refs), vec!["2.7ab"]);
}

#[test]
fn unrecognized_tokens_are_ignored() {
    let parser = parser();
    assert!(parser.parse_line("[9.x] [abc] 1999 [12]").is_empty());
    assert!(parser.parse_line("[99999999999.1]").is_empty());
}

#[test]
fn expand_lines_respects_letter_subset() {
    let verse_ref = VerseRef::parse("9.101bd").expect("ref should parse");
    let lines = expand_lines(&verse_ref)
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<String>>();
    assert_eq!(lines, vec!["9.101b", "9.101d"]);

    let malformed = VerseRef::with_lines(9, 101, LineSet::default());
    assert!(expand_lines(&malformed).is_empty());
}

#[test]
fn verse_ref_parse_rejects_garbage() {
    assert!(VerseRef::parse("9").is_none());
    assert!(VerseRef::parse("9.").is_none());
    assert!(VerseRef::parse("9.10x").is_none());
    assert!(VerseRef::parse("a.1").is_none());
    assert_eq!(VerseRef::parse(" 3.4 "), Some(VerseRef::whole(3, 4)));
}

#[test]
fn verse_refs_order_numerically_with_whole_verse_last() {
    let mut refs = ["10.1", "9.101", "9.101cd", "9.20", "9.101ab", "9.101a"]
        .iter()
        .filter_map(|raw| VerseRef::parse(raw))
        .collect::<Vec<VerseRef>>();
    refs.sort();
    assert_eq!(
        rendered(&refs),
        vec!["9.20", "9.101a", "9.101ab", "9.101cd", "9.101", "10.1"]
    );
}

#[test]
fn specificity_counts_covered_lines() {
    assert_eq!(VerseRef::whole(1, 1).specificity(), 4);
    assert_eq!(
        VerseRef::parse("1.1c").expect("ref should parse").specificity(),
        1
    );
}
