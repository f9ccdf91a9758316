use regex::Regex;
use std::iter::Peekable;
use std::sync::OnceLock;
use std::vec::IntoIter;

const PARAGRAPH_SEPARATOR: &str = "\n\n";

fn paragraph_break() -> &'static Regex {
    static BREAK_RE: OnceLock<Regex> = OnceLock::new();
    BREAK_RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("paragraph pattern is a valid regex"))
}

/// Consuming iterator over the chunks of one document
pub struct Chunks<'a> {
    paragraphs: Peekable<IntoIter<&'a str>>,
    max_chars: usize,
}

impl Iterator for Chunks<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.paragraphs.next()?;
        let mut buffer = vec![first];
        let mut current = first.chars().count();

        while let Some(next) = self.paragraphs.peek() {
            let len = next.chars().count();
            if current + len > self.max_chars {
                break;
            }
            buffer.push(next);
            current += len;
            self.paragraphs.next();
        }

        Some(buffer.join(PARAGRAPH_SEPARATOR))
    }
}

/// Split a document into passages of at most `max_chars` characters.
///
/// Paragraphs (separated by blank lines) are packed greedily; the length
/// budget counts paragraph characters only. A paragraph longer than
/// `max_chars` becomes a chunk of its own and is never truncated.
pub fn chunk_text(text: &str, max_chars: usize) -> Chunks<'_> {
    let paragraphs: Vec<&str> = paragraph_break()
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    Chunks {
        paragraphs: paragraphs.into_iter().peekable(),
        max_chars,
    }
}
