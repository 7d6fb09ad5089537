use log::info;
use rand::Rng;

use super::counts::CountTable;
use super::generator::{self, GenerationInput};
use super::lidstone::Lidstone;
use super::ngrams::{pad_sentence, Ngram};
use super::vocabulary::Vocabulary;
use crate::config::LmConfig;
use crate::error::{LmError, Result};

/// Training state of a model. The transition is one-way.
#[derive(Clone, Debug)]
enum Lifecycle {
	Untrained,
	Trained { vocabulary: Vocabulary, counts: CountTable },
}

/// Word-level n-gram language model with Lidstone smoothing.
///
/// # Responsibilities
/// - Count padded n-grams once, against a frozen vocabulary
/// - Answer smoothed conditional probabilities
/// - Generate tokens from a seed context
/// - Score sentences (log-probability, probability, perplexity)
///
/// # Invariants
/// - `order` is always >= 2
/// - `gamma` is always finite and > 0
/// - training happens exactly once; every query fails with `NotTrained`
///   before it
#[derive(Clone, Debug)]
pub struct NGramModel {
	/// The order of the model (number of tokens in the longest n-gram)
	order: usize, // must be >= 2

	/// Pseudo-count added to every n-gram count
	gamma: f64,

	lifecycle: Lifecycle,
}

impl NGramModel {
	/// Creates an untrained model of order `order`.
	///
	/// # Errors
	/// - `InvalidOrder` if `order < 2`
	/// - `InvalidGamma` if `gamma` is not a finite value > 0
	pub fn new(order: usize, gamma: f64) -> Result<Self> {
		if order < 2 {
			return Err(LmError::InvalidOrder(order));
		}
		if !(gamma.is_finite() && gamma > 0.0) {
			return Err(LmError::InvalidGamma(gamma));
		}
		Ok(Self { order, gamma, lifecycle: Lifecycle::Untrained })
	}

	/// Creates an untrained model from a validated configuration.
	pub fn from_config(config: &LmConfig) -> Result<Self> {
		config.validate()?;
		Self::new(config.order, config.gamma)
	}

	pub fn order(&self) -> usize {
		self.order
	}

	pub fn gamma(&self) -> f64 {
		self.gamma
	}

	pub fn is_trained(&self) -> bool {
		matches!(self.lifecycle, Lifecycle::Trained { .. })
	}

	/// Trains the model on an n-gram stream.
	///
	/// Every n-gram is mapped through `vocabulary` before counting, so the
	/// stream may contain raw tokens. The stream is consumed exactly once.
	///
	/// # Errors
	/// Returns `AlreadyTrained` on a second call.
	pub fn train<I>(&mut self, ngrams: I, vocabulary: Vocabulary) -> Result<()>
	where
		I: IntoIterator<Item = Ngram>,
	{
		if self.is_trained() {
			return Err(LmError::AlreadyTrained);
		}

		info!("Training the model...");
		let mut counts = CountTable::new();
		counts.accumulate(ngrams.into_iter().map(|ngram| vocabulary.lookup_all(&ngram)));
		self.finish_training(vocabulary, counts);
		Ok(())
	}

	/// Trains the model directly on tokenized sentences.
	///
	/// Padded n-grams are extracted and counted on several threads, then
	/// merged; the resulting counts equal those of [`NGramModel::train`] fed
	/// with [`padded_everygrams`](super::ngrams::padded_everygrams).
	///
	/// # Errors
	/// Returns `AlreadyTrained` on a second call.
	pub fn fit<S>(&mut self, sentences: &[S], vocabulary: Vocabulary) -> Result<()>
	where
		S: AsRef<[String]> + Sync,
	{
		if self.is_trained() {
			return Err(LmError::AlreadyTrained);
		}

		info!("Training the model on {} sentences...", sentences.len());
		let counts = CountTable::from_sentences_parallel(sentences, self.order, &vocabulary)?;
		self.finish_training(vocabulary, counts);
		Ok(())
	}

	fn finish_training(&mut self, vocabulary: Vocabulary, counts: CountTable) {
		info!(
			"Model training complete: {} n-grams, {} contexts, vocabulary of {} tokens",
			counts.ngrams(),
			counts.contexts(),
			vocabulary.len()
		);
		self.lifecycle = Lifecycle::Trained { vocabulary, counts };
	}

	/// Frozen vocabulary of a trained model.
	pub fn vocabulary(&self) -> Result<&Vocabulary> {
		match &self.lifecycle {
			Lifecycle::Trained { vocabulary, .. } => Ok(vocabulary),
			Lifecycle::Untrained => Err(LmError::NotTrained("vocabulary access")),
		}
	}

	/// Frozen count table of a trained model.
	pub fn counts(&self) -> Result<&CountTable> {
		match &self.lifecycle {
			Lifecycle::Trained { counts, .. } => Ok(counts),
			Lifecycle::Untrained => Err(LmError::NotTrained("count table access")),
		}
	}

	fn estimator(&self, operation: &'static str) -> Result<(Lidstone<'_>, &Vocabulary)> {
		match &self.lifecycle {
			Lifecycle::Trained { vocabulary, counts } => Ok((Lidstone::new(self.gamma, vocabulary, counts), vocabulary)),
			Lifecycle::Untrained => Err(LmError::NotTrained(operation)),
		}
	}

	/// Smoothed `P(target | context)`.
	///
	/// Only the last `order - 1` context tokens are used; a shorter context
	/// selects the matching lower-order counts. Out-of-vocabulary tokens
	/// are scored as `<UNK>`.
	pub fn score<S: AsRef<str>>(&self, context: &[S], target: &str) -> Result<f64> {
		let (estimator, _) = self.estimator("probability calculation")?;
		Ok(estimator.score(self.trim_context(context), target))
	}

	/// `log2` of [`NGramModel::score`]. Never `-inf`.
	pub fn logscore<S: AsRef<str>>(&self, context: &[S], target: &str) -> Result<f64> {
		Ok(self.score(context, target)?.log2())
	}

	/// Conditional distribution over the whole vocabulary after `context`,
	/// in lexicographic token order.
	pub fn distribution<S: AsRef<str>>(&self, context: &[S]) -> Result<Vec<(&str, f64)>> {
		let (estimator, vocabulary) = self.estimator("probability calculation")?;
		let context = vocabulary.lookup_all(self.trim_context(context));
		Ok(estimator.distribution(&context))
	}

	fn trim_context<'c, S>(&self, context: &'c [S]) -> &'c [S] {
		let keep = context.len().min(self.order - 1);
		&context[context.len() - keep..]
	}

	/// Base-2 log-probability of a sentence.
	///
	/// The sentence is padded like the training data and the log
	/// probabilities of every window of `order` tokens are summed.
	///
	/// # Errors
	/// Returns `NotTrained` before training.
	pub fn log_probability<S: AsRef<str>>(&self, tokens: &[S]) -> Result<f64> {
		let (estimator, vocabulary) = self.estimator("probability calculation")?;
		let padded = pad_sentence(tokens, self.order, vocabulary);

		Ok(padded
			.windows(self.order)
			.map(|window| match window.split_last() {
				Some((target, context)) => estimator.unmasked_score(context, target).log2(),
				None => 0.0,
			})
			.sum())
	}

	/// Probability of a sentence, `2^log_probability`.
	///
	/// Long sentences underflow `f64`; the result is then `0.0`.
	pub fn probability<S: AsRef<str>>(&self, tokens: &[S]) -> Result<f64> {
		Ok(self.log_probability(tokens)?.exp2())
	}

	/// Perplexity of a sentence, `2^(-log_probability / N)` with `N` the
	/// number of unpadded tokens.
	///
	/// An empty sentence returns `0.0` instead of dividing by zero.
	///
	/// # Errors
	/// Returns `NotTrained` before training, even for an empty sentence.
	pub fn perplexity<S: AsRef<str>>(&self, tokens: &[S]) -> Result<f64> {
		let log_probability = self.log_probability(tokens)?;

		let n = tokens.len();
		if n == 0 {
			return Ok(0.0);
		}

		Ok((-log_probability / n as f64).exp2())
	}

	/// Samples `num_tokens` tokens after `seed`.
	///
	/// # Errors
	/// - `NotTrained` before training
	/// - `InvalidSeed` if `seed` holds fewer than `order - 1` tokens
	pub fn generate<S, R>(&self, num_tokens: usize, seed: &[S], filter_reserved: bool, rng: &mut R) -> Result<Vec<String>>
	where
		S: AsRef<str>,
		R: Rng,
	{
		let (estimator, vocabulary) = self.estimator("text generation")?;
		info!("Generating {} tokens with seed \"{}\"", num_tokens, join_tokens(seed));
		generator::generate(estimator, vocabulary, self.order, num_tokens, seed, filter_reserved, rng)
	}

	/// Runs a generation request described by a [`GenerationInput`].
	pub fn generate_with(&self, input: &GenerationInput) -> Result<Vec<String>> {
		let mut rng = input.rng();
		self.generate(input.num_tokens, input.seed(), input.filter_reserved, &mut rng)
	}
}

fn join_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
	tokens.iter().map(|token| token.as_ref()).collect::<Vec<&str>>().join(" ")
}
