use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Padding token placed before every sentence.
pub const START_TOKEN: &str = "<s>";

/// Padding token placed after every sentence.
pub const END_TOKEN: &str = "</s>";

/// Class absorbing every token below the cutoff or unseen during training.
pub const UNKNOWN_TOKEN: &str = "<UNK>";

/// Tokens that are always part of the vocabulary, whatever their count.
pub const RESERVED_TOKENS: [&str; 3] = [START_TOKEN, END_TOKEN, UNKNOWN_TOKEN];

/// Frozen token vocabulary with rare-word suppression.
///
/// Built once from the whole training corpus. A token is *known* when it
/// occurred at least `cutoff` times; the reserved tokens are always known.
/// Every other token is mapped to [`UNKNOWN_TOKEN`] by [`Vocabulary::lookup`].
///
/// # Invariants
/// - `known` contains the three reserved tokens
/// - `known` iterates in lexicographic (byte) order, which is the order
///   used when sampling
/// - the vocabulary is never mutated after construction
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Vocabulary {
	/// Raw corpus frequency of every token seen while building.
	counts: HashMap<String, usize>,

	/// Minimum frequency for a token to be known (always >= 1).
	cutoff: usize,

	/// Tokens passing the cutoff plus the reserved tokens.
	known: BTreeSet<String>,
}

impl Vocabulary {
	/// Builds a vocabulary from a token stream.
	///
	/// A `cutoff` of 0 behaves like 1: a token has to be seen to be known.
	pub fn new<I, S>(tokens: I, cutoff: usize) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let cutoff = cutoff.max(1);

		let mut counts: HashMap<String, usize> = HashMap::new();
		for token in tokens {
			*counts.entry(token.as_ref().to_owned()).or_insert(0) += 1;
		}

		let mut known: BTreeSet<String> = counts
			.iter()
			.filter(|(_, count)| **count >= cutoff)
			.map(|(token, _)| token.clone())
			.collect();
		known.extend(RESERVED_TOKENS.iter().map(|token| (*token).to_owned()));

		Self { counts, cutoff, known }
	}

	/// Builds a vocabulary from every token of every sentence.
	pub fn from_sentences<S: AsRef<[String]>>(sentences: &[S], cutoff: usize) -> Self {
		Self::new(sentences.iter().flat_map(|sentence| sentence.as_ref().iter()), cutoff)
	}

	/// Returns `true` if `token` is part of the known set.
	pub fn contains(&self, token: &str) -> bool {
		self.known.contains(token)
	}

	/// Returns `token` itself when known, [`UNKNOWN_TOKEN`] otherwise.
	pub fn lookup<'a>(&self, token: &'a str) -> &'a str {
		if self.contains(token) { token } else { UNKNOWN_TOKEN }
	}

	/// Maps a whole sequence through [`Vocabulary::lookup`].
	pub fn lookup_all<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<String> {
		tokens.iter().map(|token| self.lookup(token.as_ref()).to_owned()).collect()
	}

	/// Corpus frequency of `token` (0 if never seen).
	pub fn count(&self, token: &str) -> usize {
		self.counts.get(token).copied().unwrap_or(0)
	}

	pub fn cutoff(&self) -> usize {
		self.cutoff
	}

	/// Label of the unknown-token class.
	pub fn unknown_token(&self) -> &'static str {
		UNKNOWN_TOKEN
	}

	/// Number of known tokens, reserved tokens included.
	pub fn len(&self) -> usize {
		self.known.len()
	}

	/// Always `false`: the reserved tokens are always present.
	pub fn is_empty(&self) -> bool {
		self.known.is_empty()
	}

	/// Known tokens in lexicographic order.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.known.iter().map(String::as_str)
	}
}

/// Returns `true` for `<s>`, `</s>` and `<UNK>`.
pub fn is_reserved(token: &str) -> bool {
	RESERVED_TOKENS.contains(&token)
}
