use super::counts::CountTable;
use super::vocabulary::Vocabulary;

/// Additive (Lidstone) smoothing over a frozen count table.
///
/// ```text
/// P(target | context) = (count(context, target) + gamma)
///                     / (total(context) + gamma * |V|)
/// ```
///
/// `|V|` is the number of known tokens, `<UNK>` and the padding tokens
/// included. An unseen context has a total of 0 and falls back to the
/// uniform distribution `1 / |V|`.
///
/// # Guarantees
/// - every probability is in `(0, 1]`
/// - for a fixed context the probabilities over the vocabulary sum to 1
#[derive(Clone, Copy, Debug)]
pub struct Lidstone<'a> {
	gamma: f64,
	vocabulary: &'a Vocabulary,
	counts: &'a CountTable,
}

impl<'a> Lidstone<'a> {
	/// `gamma` is expected to be validated (> 0) by the caller.
	pub fn new(gamma: f64, vocabulary: &'a Vocabulary, counts: &'a CountTable) -> Self {
		Self { gamma, vocabulary, counts }
	}

	pub fn gamma(&self) -> f64 {
		self.gamma
	}

	/// Probability of `target` after `context`, both already mapped
	/// through the vocabulary.
	pub fn unmasked_score(&self, context: &[String], target: &str) -> f64 {
		let count = self.counts.count(context, target) as f64;
		let total = self.counts.total(context) as f64;
		(count + self.gamma) / (total + self.gamma * self.vocabulary.len() as f64)
	}

	/// Probability of `target` after `context` for raw surface tokens.
	///
	/// Out-of-vocabulary tokens are mapped to `<UNK>` before the lookup.
	pub fn score<S: AsRef<str>>(&self, context: &[S], target: &str) -> f64 {
		let context = self.vocabulary.lookup_all(context);
		self.unmasked_score(&context, self.vocabulary.lookup(target))
	}

	/// Full conditional distribution after an already-mapped `context`.
	///
	/// Entries follow the vocabulary's lexicographic order.
	pub fn distribution(&self, context: &[String]) -> Vec<(&'a str, f64)> {
		let state = self.counts.state(context);
		let total = state.map_or(0, |state| state.total()) as f64;
		let denominator = total + self.gamma * self.vocabulary.len() as f64;

		self.vocabulary
			.iter()
			.map(|target| {
				let count = state.map_or(0, |state| state.count(target)) as f64;
				(target, (count + self.gamma) / denominator)
			})
			.collect()
	}
}
