use std::slice;

use super::vocabulary::{Vocabulary, END_TOKEN, START_TOKEN};

/// A contiguous token sequence: every token but the last is the context,
/// the last one is the target.
pub type Ngram = Vec<String>;

/// Pads a sentence for a model of order `order`.
///
/// Result: `order - 1` start tokens, the sentence mapped through the
/// vocabulary, then one end token. An empty sentence yields padding only.
pub fn pad_sentence<S: AsRef<str>>(tokens: &[S], order: usize, vocabulary: &Vocabulary) -> Vec<String> {
	let left = order.saturating_sub(1);
	let mut padded = Vec::with_capacity(left + tokens.len() + 1);
	padded.extend((0..left).map(|_| START_TOKEN.to_owned()));
	padded.extend(tokens.iter().map(|token| vocabulary.lookup(token.as_ref()).to_owned()));
	padded.push(END_TOKEN.to_owned());
	padded
}

/// Lazy stream of padded n-grams of every order `1..=order`.
///
/// Sentences are padded one at a time with [`pad_sentence`]; for every
/// start position of the padded sentence the stream yields the windows of
/// size 1, 2, ... up to `order` that fit.
///
/// The stream is single-pass. Calling [`padded_everygrams`] again on the
/// same sentence slice reproduces it exactly.
pub struct PaddedEverygrams<'a, S> {
	order: usize,
	vocabulary: &'a Vocabulary,
	sentences: slice::Iter<'a, S>,
	/// Current padded sentence.
	padded: Vec<String>,
	/// Start of the next window in `padded`.
	start: usize,
	/// Size of the next window.
	size: usize,
}

/// Builds the padded n-gram stream over `sentences` for a model of order `order`.
pub fn padded_everygrams<'a, S>(sentences: &'a [S], order: usize, vocabulary: &'a Vocabulary) -> PaddedEverygrams<'a, S>
where
	S: AsRef<[String]>,
{
	PaddedEverygrams {
		order,
		vocabulary,
		sentences: sentences.iter(),
		padded: Vec::new(),
		start: 0,
		size: 1,
	}
}

impl<S: AsRef<[String]>> Iterator for PaddedEverygrams<'_, S> {
	type Item = Ngram;

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			if self.start < self.padded.len() {
				let end = self.start + self.size;
				if self.size <= self.order && end <= self.padded.len() {
					let ngram = self.padded[self.start..end].to_vec();
					self.size += 1;
					return Some(ngram);
				}
				self.start += 1;
				self.size = 1;
				continue;
			}

			// Current sentence exhausted, pad the next one
			let sentence = self.sentences.next()?;
			self.padded = pad_sentence(sentence.as_ref(), self.order, self.vocabulary);
			self.start = 0;
			self.size = 1;
		}
	}
}
