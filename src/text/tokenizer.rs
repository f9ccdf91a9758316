use regex::{Matches, Regex};
use std::sync::OnceLock;

/// Unicode word characters: letters (accented included), digits, underscore
const TOKEN_PATTERN: &str = r"\w+";

fn token_regex() -> &'static Regex {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    TOKEN_RE.get_or_init(|| Regex::new(TOKEN_PATTERN).expect("token pattern is a valid regex"))
}

/// Lazy iterator over the lowercase word tokens of a text
pub struct Tokens<'a> {
    matches: Matches<'static, 'a>,
}

impl Iterator for Tokens<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.matches.next().map(|m| m.as_str().to_lowercase())
    }
}

/// Split text into lowercase word tokens.
///
/// Punctuation and whitespace are discarded. Calling again on the same text
/// restarts the sequence.
pub fn tokenize(text: &str) -> Tokens<'_> {
    Tokens {
        matches: token_regex().find_iter(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_strips_punctuation() {
        let tokens: Vec<String> = tokenize("Install via `cluster apply`, then CHECK!").collect();
        assert_eq!(tokens, vec!["install", "via", "cluster", "apply", "then", "check"]);
    }

    #[test]
    fn test_keeps_accents_digits_and_underscores() {
        let tokens: Vec<String> = tokenize("Validación del clúster k8s: pod_name (año 2024)").collect();
        assert_eq!(
            tokens,
            vec!["validación", "del", "clúster", "k8s", "pod_name", "año", "2024"]
        );
    }

    #[test]
    fn test_empty_and_punctuation_only() {
        assert_eq!(tokenize("").count(), 0);
        assert_eq!(tokenize("  ... --- !!! \n").count(), 0);
    }

    #[test]
    fn test_restartable() {
        let text = "one two three";
        let first: Vec<String> = tokenize(text).collect();
        let second: Vec<String> = tokenize(text).collect();
        assert_eq!(first, second);
    }
}
