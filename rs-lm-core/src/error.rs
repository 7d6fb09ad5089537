use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, LmError>;

/// Every failure the language model and its corpus layer can report.
///
/// Model variants are contract violations detected at the call site:
/// they are returned immediately and never retried. Out-of-vocabulary
/// tokens are not an error and have no variant here.
#[derive(Error, Debug)]
pub enum LmError {
	/// Model built with an order below 2.
	#[error("n-gram order must be at least 2, got {0}")]
	InvalidOrder(usize),

	/// Smoothing pseudo-count that is not a strictly positive finite number.
	#[error("gamma must be a finite value > 0, got {0}")]
	InvalidGamma(f64),

	/// `train`/`fit` called on a model that has already been trained.
	#[error("model is already trained, create a new instance to retrain")]
	AlreadyTrained,

	/// Query issued before training completed.
	#[error("model must be trained before {0}")]
	NotTrained(&'static str),

	/// Seed context shorter than `order - 1` tokens.
	#[error("seed must contain at least {required} tokens for this model, got {got}")]
	InvalidSeed { required: usize, got: usize },

	/// Configuration value rejected by validation.
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	/// Two partial count tables could not be combined.
	#[error("count table merge failed: {0}")]
	Merge(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	/// Corpus cache could not be encoded or decoded.
	#[error("corpus cache error: {0}")]
	Cache(#[from] postcard::Error),
}
