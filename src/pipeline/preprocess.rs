//! Text preprocessing: clean raw extracted text and filter it down to the
//! lines worth sending to the extractor.
//!
//! PDF text layers come out with page numbers on their own lines, runs of
//! blank lines and column padding. [`clean_text`] removes that noise without
//! touching words. [`extract_relevant_sections`] then keeps only inspection
//! lines mentioning one of a fixed set of keywords, which cuts token volume
//! on long reports.

use once_cell::sync::Lazy;
use regex::Regex;

/// Lines containing any of these (case-insensitive) survive the filter.
pub const SECTION_KEYWORDS: [&str; 8] = [
    "impacted area",
    "negative side",
    "positive side",
    "summary",
    "observation",
    "damp",
    "leakage",
    "plumbing",
];

/// Normalise whitespace in raw report text.
///
/// Rules (applied in order):
/// 1. Drop page numbers standing alone on a line
/// 2. Collapse runs of newlines to one
/// 3. Collapse runs of spaces/tabs to one space
/// 4. Trim every line, then the whole text
pub fn clean_text(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    let s = remove_page_numbers(input);
    let s = collapse_newlines(&s);
    let s = collapse_spaces(&s);
    trim_lines(&s)
}

// ── Rule 1: Page numbers ─────────────────────────────────────────────────────

static RE_PAGE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\d+\s*\n").unwrap());

fn remove_page_numbers(input: &str) -> String {
    RE_PAGE_NUMBER.replace_all(input, "\n").to_string()
}

// ── Rule 2: Blank lines ──────────────────────────────────────────────────────

static RE_MULTI_NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").unwrap());

fn collapse_newlines(input: &str) -> String {
    RE_MULTI_NEWLINE.replace_all(input, "\n").to_string()
}

// ── Rule 3: Horizontal whitespace ────────────────────────────────────────────

static RE_MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());

fn collapse_spaces(input: &str) -> String {
    RE_MULTI_SPACE.replace_all(input, " ").to_string()
}

// ── Rule 4: Trim ─────────────────────────────────────────────────────────────

fn trim_lines(input: &str) -> String {
    input
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Keep only the lines that mention a [`SECTION_KEYWORDS`] entry.
pub fn extract_relevant_sections(text: &str) -> String {
    text.lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            SECTION_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_numbers_removed() {
        assert_eq!(clean_text("Hall damp\n  12  \nBedroom dry"), "Hall damp\nBedroom dry");
    }

    #[test]
    fn test_blank_lines_and_padding_collapsed() {
        assert_eq!(
            clean_text("  Impacted Area:\t\tHall  \n\n\n\nNegative   side: damp  "),
            "Impacted Area: Hall\nNegative side: damp"
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text(" \n \n"), "");
    }

    #[test]
    fn test_numbers_inside_lines_are_kept() {
        assert_eq!(clean_text("Reading 32 C\nNext"), "Reading 32 C\nNext");
    }

    #[test]
    fn test_section_filter_keeps_keyword_lines() {
        let text = "Site visit 12 May\nImpacted Area 1: Hall\nNEGATIVE SIDE: Dampness at skirting\nCustomer name: X\nPlumbing check: Yes";
        assert_eq!(
            extract_relevant_sections(text),
            "Impacted Area 1: Hall\nNEGATIVE SIDE: Dampness at skirting\nPlumbing check: Yes"
        );
    }

    #[test]
    fn test_section_filter_no_matches() {
        assert_eq!(extract_relevant_sections("nothing relevant\nat all"), "");
    }
}
