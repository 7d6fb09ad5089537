//! Top-level module for the language model engine.
//!
//! Data flows leaf-first through:
//! - A frozen vocabulary with rare-word suppression (`Vocabulary`)
//! - Padded n-gram extraction (`padded_everygrams`)
//! - Context counting (`CountTable`, built from `State`s)
//! - Additive smoothing (`Lidstone`)
//! - The trained model and its queries (`NGramModel`)
//! - Token sampling (`generator`)

/// Token vocabulary, reserved tokens and out-of-vocabulary mapping.
pub mod vocabulary;

/// Sentence padding and the lazy multi-order n-gram stream.
pub mod ngrams;

/// Observed continuations of a single context.
pub mod state;

/// Context → target → count table, with parallel construction and merging.
pub mod counts;

/// Lidstone (additive) smoothing estimator.
pub mod lidstone;

/// Two-state n-gram model: training, scoring and generation entry points.
pub mod ngram_model;

/// Inverse-CDF sampler and generation parameters.
pub mod generator;
