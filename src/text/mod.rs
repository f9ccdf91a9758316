//! Text processing: word tokenization and paragraph chunking

mod chunker;
mod tokenizer;

pub use chunker::{chunk_text, Chunks};
pub use tokenizer::{tokenize, Tokens};
