use clap::ValueEnum;
use serde::Serialize;

const STOP_WORDS: [&str; 5] = ["the", "that", "this", "these", "those"];
const TRAILING_PUNCTUATION: [char; 4] = [':', '.', ',', ';'];

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TitleMatch {
    #[default]
    Lenient,
    Strict,
}

impl TitleMatch {
    pub fn normalize(self, input: &str) -> String {
        match self {
            Self::Lenient => normalize_lenient(input),
            Self::Strict => normalize_strict(input),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lenient => "lenient",
            Self::Strict => "strict",
        }
    }
}

/// Strips a leading `N.` / `N.N.` numbering prefix and the whitespace after it.
pub fn strip_number_prefix(input: &str) -> &str {
    let trimmed = input.trim();
    let mut rest = trimmed;
    let mut matched_end = None;

    loop {
        let digits = rest
            .find(|ch: char| !ch.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits == 0 {
            break;
        }
        let Some(after_dot) = rest[digits..].strip_prefix('.') else {
            break;
        };
        matched_end = Some(trimmed.len() - after_dot.len());
        rest = after_dot;
    }

    match matched_end {
        Some(end) => trimmed[end..].trim_start(),
        None => trimmed,
    }
}

pub fn normalize_lenient(input: &str) -> String {
    let lowered = strip_number_prefix(input).to_lowercase();
    let quoted = normalize_quotes(&lowered);
    let unbracketed = remove_bracketed(&quoted, "");
    let collapsed = collapse_whitespace(&unbracketed);

    collapsed
        .trim_end_matches(TRAILING_PUNCTUATION)
        .trim()
        .to_string()
}

pub fn normalize_strict(input: &str) -> String {
    let unbracketed = remove_bracketed(strip_number_prefix(input), " ");
    let quoted = normalize_quotes(&unbracketed.to_lowercase());

    let cleaned = quoted
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || ch == '\'' {
                ch
            } else {
                ' '
            }
        })
        .collect::<String>();

    cleaned
        .split_whitespace()
        .map(|word| word.trim_matches('\''))
        .filter(|word| !word.is_empty() && !STOP_WORDS.contains(word))
        .collect::<Vec<&str>>()
        .join(" ")
}

fn normalize_quotes(input: &str) -> String {
    input.replace(['\u{2018}', '\u{2019}'], "'")
}

fn remove_bracketed(input: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find('[') {
        let Some(close) = rest[open..].find(']') else {
            break;
        };
        out.push_str(&rest[..open]);
        out.push_str(replacement);
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);
    out
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<&str>>().join(" ")
}
