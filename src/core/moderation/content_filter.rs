// Content filter - deterministic classifier for student messages.
//
// Pure function of (text, language, banned terms). Nothing here touches
// storage; callers hand in a snapshot of the banned terms for the language.

use super::moderation_models::{ModerationFlag, ModerationResult};
use crate::core::chat::LanguageCode;
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b").expect("valid email pattern")
});

// A digit, at least seven digits or separators, then a digit.
static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\+?\d[\d\s().-]{7,}\d)\b").expect("valid phone pattern")
});

/// Classify a message.
///
/// Single-word terms match case-insensitively as whole words (for languages
/// that separate words with spaces). Terms containing a space are phrases and
/// match by case-insensitive containment. Email addresses and phone-like
/// digit runs raise `personal_info`.
pub fn classify(text: &str, language: LanguageCode, banned_terms: &[String]) -> ModerationResult {
    let mut flags = Vec::new();

    if contains_banned_term(text, language, banned_terms) {
        flags.push(ModerationFlag::Profanity);
    }
    if contains_personal_info(text) {
        flags.push(ModerationFlag::PersonalInfo);
    }

    ModerationResult::from_flags(flags)
}

fn contains_banned_term(text: &str, language: LanguageCode, banned_terms: &[String]) -> bool {
    let lowered = text.to_lowercase();

    let (phrases, words): (Vec<String>, Vec<String>) = banned_terms
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .partition(|t| t.contains(' '));

    if phrases.iter().any(|phrase| lowered.contains(phrase.as_str())) {
        return true;
    }

    if language.has_word_boundaries() {
        words.iter().any(|word| matches_whole_word(&lowered, word))
    } else {
        words.iter().any(|word| lowered.contains(word.as_str()))
    }
}

fn contains_personal_info(text: &str) -> bool {
    EMAIL_PATTERN.is_match(text) || PHONE_PATTERN.is_match(text)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Search lowercased `text` for lowercased `word` with no word character on
/// either side.
fn matches_whole_word(text: &str, word: &str) -> bool {
    // Walk every start position so an embedded occurrence cannot hide a
    // standalone one that overlaps it.
    let mut start = 0;
    while let Some(offset) = text[start..].find(word) {
        let begin = start + offset;
        let before = text[..begin].chars().next_back();
        let after = text[begin + word.len()..].chars().next();
        if !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char) {
            return true;
        }
        match text[begin..].chars().next() {
            Some(c) => start = begin + c.len_utf8(),
            None => break,
        }
    }
    false
}
