//! Corpus scanning
//!
//! Walks the corpus directory, keeps files whose extension is on the
//! allow-list, and turns each file into retrieval chunks.

use crate::error::{AssistError, Result};
use crate::text::{chunk_text, tokenize};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SNIPPET_CHARS: usize = 80;

/// One retrieval unit: a passage of corpus text and where it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// Path relative to the corpus root
    pub source_path: String,
    /// Single-line preview of the text
    pub snippet: String,
}

impl Chunk {
    pub fn new(text: String, source_path: String) -> Self {
        let snippet = make_snippet(&text);
        Self {
            text,
            source_path,
            snippet,
        }
    }
}

fn make_snippet(text: &str) -> String {
    let mut snippet: String = text
        .chars()
        .take(SNIPPET_CHARS)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();
    if text.chars().count() > SNIPPET_CHARS {
        snippet.push_str("...");
    }
    snippet
}

/// Options controlling which files are scanned and how they are chunked
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Allowed file extensions, without the leading dot, lowercase
    pub extensions: Vec<String>,
    /// Directory names skipped at any depth
    pub excluded_dirs: Vec<String>,
    pub max_chars: usize,
    /// Stop after this many chunks
    pub max_chunks: Option<usize>,
}

/// Chunks of a scanned corpus together with their tokens
#[derive(Debug, Default)]
pub struct Corpus {
    pub chunks: Vec<Chunk>,
    /// `tokens[i]` holds the tokens of `chunks[i]`
    pub tokens: Vec<Vec<String>>,
}

impl Corpus {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Append a chunk unless it carries no tokens
    pub fn push(&mut self, chunk: Chunk) -> bool {
        let tokens: Vec<String> = tokenize(&chunk.text).collect();
        if tokens.is_empty() {
            return false;
        }
        self.chunks.push(chunk);
        self.tokens.push(tokens);
        true
    }
}

/// Directory scanner producing a [`Corpus`]
pub struct CorpusScanner {
    root: PathBuf,
    options: ScanOptions,
}

impl CorpusScanner {
    pub fn new(root: PathBuf, mut options: ScanOptions) -> Self {
        options.extensions = options
            .extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect();
        Self { root, options }
    }

    /// Scan the corpus root.
    ///
    /// Fails with [`AssistError::EmptyCorpus`] when no chunk is produced.
    pub fn scan(&self) -> Result<Corpus> {
        let files = self.discover_files();
        tracing::info!(
            "Scanning {} eligible files under {}",
            files.len(),
            self.root.display()
        );

        let mut corpus = Corpus::default();
        'files: for path in files {
            let text = match std::fs::read(&path) {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(_) => {
                        tracing::debug!("Skipping non UTF-8 file {}", path.display());
                        continue;
                    }
                },
                Err(e) => {
                    return Err(AssistError::Io {
                        source: e,
                        context: format!("Failed to read corpus file: {}", path.display()),
                    })
                }
            };

            let source = self.relative_name(&path);
            for text in chunk_text(&text, self.options.max_chars) {
                corpus.push(Chunk::new(text, source.clone()));
                if self.limit_reached(corpus.len()) {
                    tracing::info!("Reached max_chunks limit of {}", corpus.len());
                    break 'files;
                }
            }
        }

        if corpus.is_empty() {
            return Err(AssistError::EmptyCorpus {
                location: self.root.display().to_string(),
            });
        }
        Ok(corpus)
    }

    fn limit_reached(&self, collected: usize) -> bool {
        self.options
            .max_chunks
            .is_some_and(|limit| collected >= limit)
    }

    /// Eligible files, sorted by path for a deterministic chunk order
    fn discover_files(&self) -> Vec<PathBuf> {
        let walker = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_excluded_dir(entry));

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable corpus entry: {}", e);
                    continue;
                }
            };
            if entry.file_type().is_file() && self.has_allowed_extension(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        files
    }

    fn is_excluded_dir(&self, entry: &walkdir::DirEntry) -> bool {
        entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.options.excluded_dirs.iter().any(|d| d == name))
    }

    fn has_allowed_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .is_some_and(|ext| self.options.extensions.contains(&ext))
    }

    fn relative_name(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options() -> ScanOptions {
        ScanOptions {
            extensions: vec!["md".to_string(), ".TXT".to_string()],
            excluded_dirs: vec!["tmp".to_string()],
            max_chars: 1200,
            max_chunks: None,
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_snippet_truncation() {
        let short = Chunk::new("line one\nline two".to_string(), "a.md".to_string());
        assert_eq!(short.snippet, "line one line two");

        let long = Chunk::new("y".repeat(100), "a.md".to_string());
        assert_eq!(long.snippet, format!("{}...", "y".repeat(80)));
    }

    #[test]
    fn test_scan_filters_extensions_and_excluded_dirs() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "docs/guide.md", "Guide to the cluster");
        write(temp.path(), "notes.TXT", "Notes about deployments");
        write(temp.path(), "main.rs", "fn main() {}");
        write(temp.path(), "tmp/cache.md", "generated content");
        write(temp.path(), "docs/tmp/nested.md", "also generated");

        let corpus = CorpusScanner::new(temp.path().to_path_buf(), options())
            .scan()
            .unwrap();

        let sources: Vec<&str> = corpus.chunks.iter().map(|c| c.source_path.as_str()).collect();
        assert_eq!(sources, vec!["docs/guide.md", "notes.TXT"]);
        assert_eq!(corpus.tokens[0], vec!["guide", "to", "the", "cluster"]);
    }

    #[test]
    fn test_scan_skips_invalid_utf8_and_tokenless_chunks() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("binary.md"), [0xff, 0xfe, 0x00]).unwrap();
        write(temp.path(), "punct.md", "--- !!!\n\n...");
        write(temp.path(), "real.md", "real words");

        let corpus = CorpusScanner::new(temp.path().to_path_buf(), options())
            .scan()
            .unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.chunks[0].source_path, "real.md");
    }

    #[test]
    fn test_max_chunks_caps_scan() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.md", "alpha\n\nbeta\n\ngamma");
        write(temp.path(), "b.md", "delta");

        let mut opts = options();
        opts.max_chars = 1;
        opts.max_chunks = Some(2);
        let corpus = CorpusScanner::new(temp.path().to_path_buf(), opts)
            .scan()
            .unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.chunks[1].text, "beta");
    }

    #[test]
    fn test_empty_corpus_error() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "code.rs", "fn main() {}");

        let err = CorpusScanner::new(temp.path().to_path_buf(), options())
            .scan()
            .unwrap_err();
        assert!(matches!(err, AssistError::EmptyCorpus { .. }));
    }
}
