use std::collections::HashMap;
use std::sync::mpsc;
use std::thread;

use log::debug;
use serde::{Deserialize, Serialize};

use super::ngrams::{padded_everygrams, Ngram};
use super::state::State;
use super::vocabulary::Vocabulary;
use crate::error::Result;

/// Context → target → count table built from padded n-grams.
///
/// # Responsibilities
/// - Accumulate n-grams of every order (the empty context holds unigrams)
/// - Answer `count(context, target)` and `total(context)` lookups
/// - Merge with another table built from a different corpus chunk
///
/// # Invariants
/// - Counts only grow; there is no removal
/// - Each state in `states` corresponds to a unique context
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CountTable {
	/// Mapping from a context to its observed continuations
	states: HashMap<Vec<String>, State>,

	/// Number of n-grams accumulated so far
	ngrams: u64,
}

impl CountTable {
	/// Creates an empty table.
	pub fn new() -> Self {
		Self::default()
	}

	/// Counts a single n-gram. Empty n-grams carry no target and are ignored.
	pub fn add_ngram(&mut self, ngram: &[String]) {
		let Some((target, context)) = ngram.split_last() else {
			return;
		};

		// Get or create the state for this context
		let state = self.states.entry(context.to_vec()).or_insert_with(|| State::new(context));
		state.add_transition(target);
		self.ngrams += 1;
	}

	/// Consumes an n-gram stream, counting every element once.
	pub fn accumulate<I>(&mut self, ngrams: I)
	where
		I: IntoIterator<Item = Ngram>,
	{
		for ngram in ngrams {
			self.add_ngram(&ngram);
		}
	}

	/// Number of times `target` followed `context`.
	pub fn count(&self, context: &[String], target: &str) -> u64 {
		self.states.get(context).map_or(0, |state| state.count(target))
	}

	/// Number of times `context` was observed (0 for unseen contexts).
	pub fn total(&self, context: &[String]) -> u64 {
		self.states.get(context).map_or(0, State::total)
	}

	/// Returns the state of `context` if it was observed.
	pub fn state(&self, context: &[String]) -> Option<&State> {
		self.states.get(context)
	}

	/// Number of distinct contexts.
	pub fn contexts(&self) -> usize {
		self.states.len()
	}

	/// Number of n-grams counted.
	pub fn ngrams(&self) -> u64 {
		self.ngrams
	}

	/// Merges another table into this one.
	///
	/// # Notes
	/// - Counts for matching contexts and targets are summed.
	/// - Merging is commutative and associative, so chunk order does not
	///   change the result.
	pub fn merge(&mut self, other: &Self) -> Result<()> {
		for (key, state) in &other.states {
			if let Some(existing) = self.states.get_mut(key) {
				existing.merge(state)?;
			} else {
				self.states.insert(key.clone(), state.clone());
			}
		}
		self.ngrams += other.ngrams;

		Ok(())
	}

	/// Counts the padded n-grams of `sentences` sequentially.
	pub fn from_sentences<S: AsRef<[String]>>(sentences: &[S], order: usize, vocabulary: &Vocabulary) -> Self {
		let mut table = Self::new();
		table.accumulate(padded_everygrams(sentences, order, vocabulary));
		table
	}

	/// Counts the padded n-grams of `sentences` on several threads.
	///
	/// # Behavior
	/// - Splits the sentences into chunks (based on CPU cores * factor).
	/// - Spawns scoped threads to build a partial table for each chunk.
	/// - Merges all partial tables received over an MPSC channel.
	///
	/// The result is identical to [`CountTable::from_sentences`].
	pub fn from_sentences_parallel<S>(sentences: &[S], order: usize, vocabulary: &Vocabulary) -> Result<Self>
	where
		S: AsRef<[String]> + Sync,
	{
		if sentences.is_empty() {
			return Ok(Self::new());
		}

		let cpus = num_cpus::get();
		let factor = 8;
		let chunks = cpus * factor;
		let chunk_size = sentences.len().div_ceil(chunks);

		let (tx, rx) = mpsc::channel();
		thread::scope(|scope| {
			for chunk in sentences.chunks(chunk_size) {
				let tx = tx.clone();
				scope.spawn(move || {
					let partial = Self::from_sentences(chunk, order, vocabulary);
					// rx lives past the scope, so the send cannot fail
					let _ = tx.send(partial);
				});
			}
		});
		drop(tx);

		let mut table = Self::new();
		for partial in rx.iter() {
			debug!("merging partial count table ({} n-grams)", partial.ngrams());
			table.merge(&partial)?;
		}

		Ok(table)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn corpus() -> Vec<Vec<String>> {
		vec![
			vec!["the".into(), "cat".into(), "sat".into()],
			vec!["the".into(), "dog".into(), "ran".into()],
		]
	}

	fn ctx(words: &[&str]) -> Vec<String> {
		words.iter().map(|w| (*w).to_owned()).collect()
	}

	#[test]
	fn counts_bigrams_and_unigrams() {
		let sentences = corpus();
		let vocab = Vocabulary::from_sentences(&sentences, 1);
		let table = CountTable::from_sentences(&sentences, 2, &vocab);

		assert_eq!(table.count(&ctx(&["the"]), "cat"), 1);
		assert_eq!(table.count(&ctx(&["the"]), "dog"), 1);
		assert_eq!(table.total(&ctx(&["the"])), 2);
		assert_eq!(table.count(&ctx(&["<s>"]), "the"), 2);
		assert_eq!(table.count(&ctx(&["sat"]), "</s>"), 1);

		// unigrams live under the empty context: 5 padded tokens per sentence
		assert_eq!(table.total(&[]), 10);
		assert_eq!(table.count(&[], "the"), 2);
		assert_eq!(table.total(&ctx(&["never"])), 0);
	}

	#[test]
	fn totals_match_sum_of_transitions() {
		let sentences = corpus();
		let vocab = Vocabulary::from_sentences(&sentences, 1);
		let table = CountTable::from_sentences(&sentences, 3, &vocab);
		for state in table.states.values() {
			assert_eq!(state.transitions().map(|(_, c)| c).sum::<u64>(), state.total());
		}
	}

	#[test]
	fn ignores_empty_ngrams() {
		let mut table = CountTable::new();
		table.add_ngram(&[]);
		assert_eq!(table.ngrams(), 0);
		assert_eq!(table.contexts(), 0);
	}

	#[test]
	fn parallel_counting_matches_sequential() {
		let mut sentences = corpus();
		for i in 0..200 {
			sentences.push(vec![format!("w{}", i % 7), "the".into(), format!("w{}", i % 3)]);
		}
		let vocab = Vocabulary::from_sentences(&sentences, 2);

		let sequential = CountTable::from_sentences(&sentences, 2, &vocab);
		let parallel = CountTable::from_sentences_parallel(&sentences, 2, &vocab).unwrap();
		assert_eq!(sequential, parallel);
	}

	#[test]
	fn merge_is_additive() {
		let sentences = corpus();
		let vocab = Vocabulary::from_sentences(&sentences, 1);
		let mut left = CountTable::from_sentences(&sentences[..1], 2, &vocab);
		let right = CountTable::from_sentences(&sentences[1..], 2, &vocab);
		left.merge(&right).unwrap();
		assert_eq!(left, CountTable::from_sentences(&sentences, 2, &vocab));
	}
}
