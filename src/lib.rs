//! arkassist - repository assistant with a self-trained retrieval model
//!
//! Indexes the text files of a repository, trains a small autoencoder to embed
//! passages, and answers free-text questions with the closest passages and
//! the best matching commands of the host tool.

pub mod cli;
pub mod commands;
pub mod config;
pub mod corpus;
pub mod error;
pub mod linalg;
pub mod model;
pub mod pipeline;
pub mod query;
pub mod store;
pub mod text;
pub mod vocab;

pub use error::{AssistError, Result};
