//! Writing-style heuristics for evidence text
//!
//! Each boolean is the OR of a phrase-pattern match and a ratio threshold,
//! so stylistic signals the pattern lists miss still register.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Exclamations per word above which text counts as sensational
pub const EXCLAMATION_THRESHOLD: f64 = 0.02;
/// All-caps words per word above which text counts as sensational
pub const UPPERCASE_THRESHOLD: f64 = 0.05;
/// Subjective-lexicon words per word above which text counts as opinion
pub const SUBJECTIVE_THRESHOLD: f64 = 0.01;

lazy_static! {
    static ref SENSATIONAL_PATTERNS: Vec<Regex> = [
        r"shocking",
        r"you won['\x{2019}]t believe",
        r"unbeliev",
        r"exposed",
        r"outrage",
        r"breakthrough",
        r"guarantee",
        r"miracle",
        r"worst",
        r"best ever",
        r"claim(s)? that",
        r"you won['\x{2019}]t",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    static ref OPINION_PATTERNS: Vec<Regex> = [
        r"\bi think\b",
        r"\bin my opinion\b",
        r"\bwe believe\b",
        r"\bit seems\b",
        r"\bapparently\b",
        r"\bshould\b",
        r"\bmust\b",
        r"\bthat['\x{2019}]s why\b",
        r"\bimo\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Hedging and attribution words
pub const SUBJECTIVE_LEXICON: &[&str] = &[
    "alleged",
    "claim",
    "claims",
    "apparently",
    "reportedly",
    "rumor",
    "rumour",
    "opinion",
    "suggest",
    "possibly",
    "likely",
    "unlikely",
    "purported",
    "allegedly",
    "appears",
    "seems",
    "argue",
    "argues",
];

const WORD_TRIM: &[char] = &[
    '.', ',', ';', ':', '(', ')', '"', '\'', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}',
];

/// Style signals for one piece of text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WritingStyle {
    pub sensational_language: bool,
    pub opinion_markers: bool,
    pub exclamation_ratio: f64,
    pub uppercase_ratio: f64,
    pub subjective_score: f64,
    pub word_count: usize,
}

/// Analyze `text`. Empty input yields the all-zero record.
pub fn analyze(text: &str) -> WritingStyle {
    let plain = WHITESPACE.replace_all(text.trim(), " ");
    let words: Vec<&str> = plain.split(' ').filter(|w| !w.is_empty()).collect();
    if words.is_empty() {
        return WritingStyle::default();
    }

    let word_count = words.len();
    let denom = word_count as f64;
    let lowered = plain.to_lowercase();

    let sensational = SENSATIONAL_PATTERNS.iter().any(|re| re.is_match(&lowered));
    let opinion = OPINION_PATTERNS.iter().any(|re| re.is_match(&lowered));

    let exclamation_ratio = plain.matches('!').count() as f64 / denom;
    let uppercase_ratio = words.iter().filter(|w| is_all_caps(w)).count() as f64 / denom;
    let subjective_score = words
        .iter()
        .filter(|w| {
            let word = w.to_lowercase();
            SUBJECTIVE_LEXICON.contains(&word.trim_matches(WORD_TRIM))
        })
        .count() as f64
        / denom;

    WritingStyle {
        sensational_language: sensational
            || exclamation_ratio > EXCLAMATION_THRESHOLD
            || uppercase_ratio > UPPERCASE_THRESHOLD,
        opinion_markers: opinion || subjective_score > SUBJECTIVE_THRESHOLD,
        exclamation_ratio: round4(exclamation_ratio),
        uppercase_ratio: round4(uppercase_ratio),
        subjective_score: round4(subjective_score),
        word_count,
    }
}

/// Longer than one character, has a cased letter, and no lowercase letters.
fn is_all_caps(word: &str) -> bool {
    word.chars().count() > 1
        && word.chars().any(char::is_uppercase)
        && !word.chars().any(char::is_lowercase)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text() {
        assert_eq!(analyze(""), WritingStyle::default());
        assert_eq!(analyze("   \n\t "), WritingStyle::default());
    }

    #[test]
    fn test_neutral_reporting() {
        let style = analyze("The city council approved the ordinance on Monday after a public hearing.");

        assert!(!style.sensational_language);
        assert!(!style.opinion_markers);
        assert_eq!(style.word_count, 12);
        assert_eq!(style.exclamation_ratio, 0.0);
    }

    #[test]
    fn test_sensational_phrase() {
        let style = analyze("You won't believe what the mayor said about the new rule");
        assert!(style.sensational_language);

        let curly = analyze("You won\u{2019}t believe what the mayor said about the new rule");
        assert!(curly.sensational_language);
    }

    #[test]
    fn test_exclamation_threshold() {
        // 1 exclamation over 10 words = 0.1 > 0.02
        let style = analyze("the ban starts today and everyone is talking about it!");
        assert!(style.sensational_language);
        assert_eq!(style.exclamation_ratio, 0.1);
    }

    #[test]
    fn test_uppercase_ratio() {
        let style = analyze("BREAKING the city BANS bags");

        assert_eq!(style.uppercase_ratio, 0.4);
        assert!(style.sensational_language);
        // single capital letters do not count
        assert_eq!(analyze("I A").uppercase_ratio, 0.0);
    }

    #[test]
    fn test_opinion_markers() {
        assert!(analyze("In my opinion the ban is a mistake").opinion_markers);
        assert!(analyze("The ban was reportedly delayed").opinion_markers);
        // "mustard" is not "must"
        assert!(!analyze("The mustard factory reopened downtown yesterday afternoon").opinion_markers);
    }

    #[test]
    fn test_subjective_score_strips_punctuation() {
        let style = analyze("Officials (allegedly) moved the date.");
        assert_eq!(style.subjective_score, 0.2);
    }
}
