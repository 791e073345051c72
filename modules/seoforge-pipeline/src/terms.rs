//! Term matching and the text forms terms take inside prompts.

use std::fmt;

use regex::Regex;
use seoforge_common::{Term, UsageRange};

/// The keyword's whitespace-separated tokens. Each must appear verbatim in
/// titles, descriptions and headings.
pub fn exact_phrases(keyword: &str) -> Vec<String> {
    keyword.split_whitespace().map(str::to_string).collect()
}

/// Whether `term` occurs in `html` as a whole word, ignoring case.
pub fn contains_whole_word(html: &str, term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }
    whole_word_pattern(&needle).is_match(&html.to_lowercase())
}

/// Occurrences of `term` that start on a word boundary. The end is left open
/// so plurals and other suffixed forms count too.
pub fn count_prefix_matches(html: &str, term: &str) -> usize {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return 0;
    }
    prefix_pattern(&needle).find_iter(&html.to_lowercase()).count()
}

fn whole_word_pattern(needle: &str) -> Regex {
    Regex::new(&format!(r"\b{}\b", regex::escape(needle))).expect("escaped term is a valid regex")
}

fn prefix_pattern(needle: &str) -> Regex {
    Regex::new(&format!(r"\b{}", regex::escape(needle))).expect("escaped term is a valid regex")
}

/// A content term used far more often than its suggested range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverusedTerm {
    pub term: String,
    pub usage: UsageRange,
    pub current: usize,
}

impl fmt::Display for OverusedTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: should be used {}x times (currently used {} times)",
            self.term, self.usage, self.current
        )
    }
}

// --- Prompt formatting ---

/// `- "term" (N%)` per line. Terms without a weight are listed bare.
pub fn format_weighted(terms: &[Term]) -> String {
    terms
        .iter()
        .map(|t| match t.weight {
            Some(w) => format!("- \"{}\" ({w}%)", t.text),
            None => format!("- \"{}\"", t.text),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `term: lo-hi times` per line, for terms that carry a usage range.
pub fn format_with_targets(terms: &[Term]) -> String {
    terms
        .iter()
        .map(|t| match t.usage {
            Some(usage) => format!("{}: {usage} times", t.text),
            None => t.text.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_overused(terms: &[OverusedTerm]) -> String {
    terms
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_list(items: &[String]) -> String {
    items.join("\n")
}
