use std::collections::VecDeque;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::lidstone::Lidstone;
use super::vocabulary::{is_reserved, Vocabulary, UNKNOWN_TOKEN};
use crate::error::{LmError, Result};

/// Input parameters for a generation request.
///
/// # Responsibilities
/// - Track how many tokens to draw and whether to strip reserved tokens
/// - Hold the seed context the Markov window starts from
/// - Optionally pin the random source for reproducible output
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationInput {
	/// Number of tokens to sample.
	pub num_tokens: usize,

	/// Remove `<s>`, `</s>` and `<UNK>` from the returned tokens.
	/// Sampling itself is not affected.
	pub filter_reserved: bool,

	/// Seed for a `StdRng`. `None` uses the thread-local generator.
	pub random_seed: Option<u64>,

	/// Initial context (at least `order - 1` tokens).
	seed: Vec<String>,
}

impl GenerationInput {
	/// Creates an input drawing `num_tokens` tokens after `seed`, with
	/// reserved tokens filtered out.
	pub fn new<S: AsRef<str>>(num_tokens: usize, seed: &[S]) -> Self {
		Self {
			num_tokens,
			filter_reserved: true,
			random_seed: None,
			seed: seed.iter().map(|token| token.as_ref().to_owned()).collect(),
		}
	}

	pub fn seed(&self) -> &[String] {
		&self.seed
	}

	/// Replaces the seed context.
	///
	/// # Errors
	/// Returns `InvalidSeed` if the seed is empty: no model order accepts it.
	pub fn set_seed<S: AsRef<str>>(&mut self, seed: &[S]) -> Result<()> {
		if seed.is_empty() {
			return Err(LmError::InvalidSeed { required: 1, got: 0 });
		}
		self.seed = seed.iter().map(|token| token.as_ref().to_owned()).collect();
		Ok(())
	}

	/// Random source selected by `random_seed`.
	pub(crate) fn rng(&self) -> StdRng {
		match self.random_seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_rng(&mut rand::rng()),
		}
	}
}

/// Draws one token by inverse-CDF sampling.
///
/// A uniform value in `[0, 1)` is drawn, then the distribution is walked
/// in order while accumulating probabilities; the first token whose
/// running sum exceeds the draw is returned.
///
/// Returns `None` only for an empty distribution.
pub fn sample<'a, R: Rng>(distribution: &[(&'a str, f64)], rng: &mut R) -> Option<&'a str> {
	let draw: f64 = rng.random();

	let mut cumulative = 0.0;
	for (token, probability) in distribution {
		cumulative += probability;
		if cumulative > draw {
			return Some(*token);
		}
	}

	// Rounding can leave the running sum just below the draw
	debug!("cumulative sum {cumulative} did not exceed draw {draw}, using last token");
	distribution.last().map(|(token, _)| *token)
}

/// Endless stream of sampled tokens, reserved tokens included.
///
/// Each step samples from the distribution of the current window, then
/// slides the window over the drawn token.
pub struct Tokens<'m, 'r, R> {
	estimator: Lidstone<'m>,
	window: VecDeque<String>,
	rng: &'r mut R,
}

impl<R: Rng> Iterator for Tokens<'_, '_, R> {
	type Item = String;

	fn next(&mut self) -> Option<String> {
		let distribution = self.estimator.distribution(self.window.make_contiguous());
		let token = sample(&distribution, &mut *self.rng).unwrap_or(UNKNOWN_TOKEN).to_owned();

		self.window.pop_front();
		self.window.push_back(token.clone());
		Some(token)
	}
}

/// Starts a token stream from the last `order - 1` tokens of `seed`,
/// mapped through the vocabulary.
///
/// # Errors
/// Returns `InvalidSeed` if `seed` holds fewer than `order - 1` tokens.
pub fn tokens<'m, 'r, S, R>(
	estimator: Lidstone<'m>,
	vocabulary: &Vocabulary,
	order: usize,
	seed: &[S],
	rng: &'r mut R,
) -> Result<Tokens<'m, 'r, R>>
where
	S: AsRef<str>,
	R: Rng,
{
	let required = order - 1;
	if seed.len() < required {
		return Err(LmError::InvalidSeed { required, got: seed.len() });
	}

	let window = vocabulary.lookup_all(&seed[seed.len() - required..]).into();
	Ok(Tokens { estimator, window, rng })
}

/// Samples `num_tokens` tokens after `seed` from a smoothed estimator.
///
/// Drawing `</s>` does not stop the generation: it is an ordinary
/// vocabulary entry, removed afterwards when `filter_reserved` is set.
/// The output grows with the tokens actually drawn; `num_tokens` is never
/// used to reserve memory up front.
///
/// # Errors
/// Returns `InvalidSeed` if `seed` holds fewer than `order - 1` tokens.
pub fn generate<S, R>(
	estimator: Lidstone<'_>,
	vocabulary: &Vocabulary,
	order: usize,
	num_tokens: usize,
	seed: &[S],
	filter_reserved: bool,
	rng: &mut R,
) -> Result<Vec<String>>
where
	S: AsRef<str>,
	R: Rng,
{
	let mut generated: Vec<String> = tokens(estimator, vocabulary, order, seed, rng)?.take(num_tokens).collect();

	if filter_reserved {
		generated.retain(|token| !is_reserved(token));
	}

	info!("Generated {} tokens ({} requested)", generated.len(), num_tokens);
	Ok(generated)
}
