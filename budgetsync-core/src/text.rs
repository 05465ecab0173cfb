//! Display-name cleanup for raw merchant labels.

use regex::Regex;
use std::sync::LazyLock;

static RE_DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{3,}\b").expect("digit-run regex"));
static RE_PROCESSOR_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:pos|ach|dbt|debit|credit|purchase|payment)\b").expect("noise regex")
});

/// Placeholder used when a label is blank
pub const PLACEHOLDER_NAME: &str = "Transaction";

/// Turn a raw label like `"POS DEBIT STARBUCKS STORE 0123"` into
/// `"Starbucks Store"`.
///
/// Digit runs of three or more and payment-processor tokens are removed.
/// If nothing is left the original (whitespace-collapsed) text is used
/// instead. Words of three characters or fewer are upper-cased, everything
/// else is title-cased.
pub fn clean_name(raw: &str) -> String {
    let base = collapse_whitespace(raw);
    if base.is_empty() {
        return PLACEHOLDER_NAME.to_string();
    }

    let stripped = RE_DIGIT_RUN.replace_all(&base, "");
    let stripped = RE_PROCESSOR_NOISE.replace_all(&stripped, "");
    let cleaned = collapse_whitespace(&stripped);

    let source = if cleaned.is_empty() { &base } else { &cleaned };
    source
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn case_word(word: &str) -> String {
    if word.chars().count() <= 3 {
        return word.to_uppercase();
    }
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
