use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{LmError, Result};

/// Observed continuations of a single context.
///
/// A `State` corresponds to a fixed context (`key`, possibly empty for
/// unigrams) and stores how many times each target token followed it.
///
/// Conceptually, this is a node in a Markov chain where outgoing edges
/// are weighted by their number of observations.
///
/// ## Invariants
/// - Each transition count is strictly positive
/// - `total` is the sum of all transition counts, i.e. the number of
///   times the context was observed
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct State {
	/// Context tokens (n-1 tokens of an n-gram).
	key: Vec<String>,
	/// Outgoing transitions indexed by the target token.
	/// Example: { "cat" => 42, "dog" => 3 }
	transitions: HashMap<String, u64>,
	/// Sum of all transition counts.
	total: u64,
}

impl State {
	/// Creates a new empty state for the given context.
	pub fn new(key: &[String]) -> Self {
		Self {
			key: key.to_vec(),
			transitions: HashMap::new(),
			total: 0,
		}
	}

	/// Records one occurrence of `target` after this context.
	pub fn add_transition(&mut self, target: &str) {
		if let Some(occurrence) = self.transitions.get_mut(target) {
			*occurrence += 1;
		} else {
			self.transitions.insert(target.to_owned(), 1);
		}
		self.total += 1;
	}

	/// Number of times `target` followed this context.
	pub fn count(&self, target: &str) -> u64 {
		self.transitions.get(target).copied().unwrap_or(0)
	}

	/// Number of times this context was observed.
	pub fn total(&self) -> u64 {
		self.total
	}

	/// Observed targets with their counts, in no particular order.
	pub fn transitions(&self) -> impl Iterator<Item = (&str, u64)> {
		self.transitions.iter().map(|(target, occurrence)| (target.as_str(), *occurrence))
	}

	/// Merges another state into this one.
	///
	/// Both states must represent the same context (`key`).
	/// Transition counts are summed.
	///
	/// This is what makes parallel counting possible: partial tables built
	/// from disjoint corpus chunks are combined into a single one.
	///
	/// # Errors
	/// Returns an error if the state keys do not match.
	pub fn merge(&mut self, other: &Self) -> Result<()> {
		if self.key != other.key {
			return Err(LmError::Merge(format!("context mismatch: {:?} vs {:?}", self.key, other.key)));
		}

		for (target, occurrence) in &other.transitions {
			*self.transitions.entry(target.clone()).or_insert(0) += *occurrence;
		}
		self.total += other.total;

		Ok(())
	}
}
