//! Word-level n-gram language model library.
//!
//! This crate provides a statistical language model engine including:
//! - Vocabulary construction with rare-word suppression
//! - Padded multi-order n-gram counting (sequential or parallel)
//! - Lidstone (additive) smoothing
//! - Seeded text generation, sentence log-probability and perplexity
//! - A corpus provider with tokenization and a binary cache
//!
//! Typical flow: load a [`corpus::Corpus`], build its vocabulary, `fit`
//! an [`model::ngram_model::NGramModel`], then query it.

/// Core language model: vocabulary, counting, smoothing, generation.
pub mod model;

/// Corpus loading, tokenization and caching.
pub mod corpus;

/// Training configuration.
pub mod config;

/// Error type shared by every fallible operation.
pub mod error;

/// I/O utilities (file loading, path helpers, report output).
pub mod io;

pub use config::LmConfig;
pub use corpus::{tokenize, Corpus};
pub use error::{LmError, Result};
pub use model::generator::GenerationInput;
pub use model::ngram_model::NGramModel;
pub use model::vocabulary::Vocabulary;
