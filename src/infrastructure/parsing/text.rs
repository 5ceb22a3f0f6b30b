//! Text normalization helpers shared by the field strategies
//!
//! Whitespace collapsing, mojibake repair, number scanning, duration/level
//! recognition and compiled phrase lists.

use super::error::{ParsingError, ParsingResult};
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d[\d,]*(?:\.\d+)?\b").unwrap());
static DURATION_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(weeks?|hours?|hrs?|minutes?|mins?)\b").unwrap());
static DURATION_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,3})\s*(weeks?|hours?|hrs?|minutes?|mins?)\b").unwrap());
static LEVEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(beginner|intermediate|advanced|all levels)\b").unwrap());
static MODULES_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\d+\s+modules?$|there are\s+\d+\s+modules").unwrap());

/// Mojibake sequences produced by UTF-8 text decoded as Windows-1252
const MOJIBAKE: &[(&str, &str)] = &[
    ("â€™", "\u{2019}"),
    ("â€œ", "\u{201C}"),
    ("â€\u{9D}", "\u{201D}"),
    ("â€“", "\u{2013}"),
    ("â€”", "\u{2014}"),
    ("â€¢", "\u{2022}"),
    ("â€˜", "\u{2018}"),
    ("â€¦", "\u{2026}"),
    ("â€", "\u{201D}"),
    ("Â", " "),
];

/// Collapse all whitespace runs into single spaces and trim
pub fn clean_text(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Repair common mojibake, then collapse whitespace
pub fn fix_text_encoding(text: &str) -> String {
    let mut out = text.to_string();
    for (bad, good) in MOJIBAKE {
        if out.contains(bad) {
            out = out.replace(bad, good);
        }
    }
    clean_text(&out)
}

/// All numbers in the text, thousands separators removed
pub fn extract_numbers(text: &str) -> Vec<f64> {
    NUMBER
        .find_iter(text)
        .filter_map(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        .collect()
}

pub fn first_number(text: &str) -> Option<f64> {
    extract_numbers(text).into_iter().next()
}

/// True when the text mentions a duration unit (week/hour/minute and abbreviations)
pub fn is_duration(text: &str) -> bool {
    DURATION_WORD.is_match(text)
}

/// True when the text contains `<digits> <unit>`
pub fn has_duration_phrase(text: &str) -> bool {
    DURATION_PHRASE.is_match(text)
}

/// First `<digits> <unit>` phrase in the text, unit canonicalized
pub fn find_duration_phrase(text: &str) -> Option<String> {
    DURATION_PHRASE
        .captures(text)
        .map(|caps| format!("{} {}", &caps[1], canonical_unit(&caps[1], &caps[2])))
}

/// Rewrite every `<digits><unit>` in the text with a canonical unit name
/// pluralized for its quantity ("1 hrs" -> "1 hour", "3 wk" untouched).
pub fn canonicalize_duration(text: &str) -> String {
    let replaced = DURATION_PHRASE.replace_all(text, |caps: &regex::Captures<'_>| {
        format!("{} {}", &caps[1], canonical_unit(&caps[1], &caps[2]))
    });
    clean_text(&replaced)
}

fn canonical_unit(quantity: &str, unit: &str) -> &'static str {
    let singular = quantity.trim_start_matches('0') == "1";
    let unit = unit.to_lowercase();
    let (one, many) = if unit.starts_with("hr") || unit.starts_with("hour") {
        ("hour", "hours")
    } else if unit.starts_with("min") {
        ("minute", "minutes")
    } else {
        ("week", "weeks")
    };
    if singular { one } else { many }
}

pub fn is_level(text: &str) -> bool {
    LEVEL.is_match(text)
}

/// Canonical prerequisite level named in the text, if any
pub fn find_level(text: &str) -> Option<String> {
    let found = LEVEL.find(text)?.as_str().to_lowercase();
    let level = match found.as_str() {
        "beginner" => "Beginner",
        "intermediate" => "Intermediate",
        "advanced" => "Advanced",
        _ => "All Levels",
    };
    Some(level.to_string())
}

/// Lines that only restate the module count ("5 modules", "There are 5 modules ...")
pub fn is_modules_line(line: &str) -> bool {
    MODULES_LINE.is_match(line.trim())
}

/// Split prose into sentence-sized pieces on terminal punctuation and newlines
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            push_piece(&mut pieces, &mut current);
            continue;
        }
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|n| n.is_whitespace()) {
            push_piece(&mut pieces, &mut current);
        }
    }
    push_piece(&mut pieces, &mut current);
    pieces
}

fn push_piece(pieces: &mut Vec<String>, current: &mut String) {
    let piece = current.trim();
    if !piece.is_empty() {
        pieces.push(piece.to_string());
    }
    current.clear();
}

/// Truncate to at most `max_chars` characters on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// A compiled, case-insensitive phrase list
#[derive(Debug, Clone, Default)]
pub struct PhraseSet {
    patterns: Vec<Regex>,
}

impl PhraseSet {
    /// Compile regex phrases; matching is always case-insensitive
    pub fn compile(list: &str, phrases: &[String]) -> ParsingResult<Self> {
        let patterns = phrases
            .iter()
            .map(|p| {
                Regex::new(&format!("(?i){p}"))
                    .map_err(|e| ParsingError::invalid_pattern(list, p, e))
            })
            .collect::<ParsingResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }

    /// Number of distinct phrases found in the text
    pub fn count_matches(&self, text: &str) -> usize {
        self.patterns.iter().filter(|p| p.is_match(text)).count()
    }

    /// Remove every phrase occurrence, then tidy leftover separators
    pub fn strip(&self, text: &str) -> String {
        let mut out = text.to_string();
        for pattern in &self.patterns {
            out = pattern.replace_all(&out, "").into_owned();
        }
        clean_text(out.trim_start_matches(|c: char| c.is_whitespace() || c == ':' || c == '-'))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
