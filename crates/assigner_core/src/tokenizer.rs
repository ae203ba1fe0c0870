//! Word tokenizer shared by vectorizer fit and transform

use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("token pattern is a valid regex"));

/// Split text into lowercase tokens.
///
/// A token is a maximal run of Unicode letters or digits. Everything else,
/// including underscores, separates tokens. No stop words are removed and
/// single-character tokens are kept.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}
