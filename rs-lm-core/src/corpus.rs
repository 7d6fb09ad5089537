//! Corpus provider: plain-text loading, word tokenization and a binary
//! cache of the tokenized sentences.

use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::io::{cache_path, corpus_name, read_lines};
use crate::model::vocabulary::Vocabulary;

/// Tokenized training corpus: one entry per sentence, lowercase tokens.
///
/// A corpus file holds one sentence per line. The first load tokenizes
/// it and stores the result next to it with the `bin` extension; later
/// loads read that cache instead, as long as it is not older than the
/// text file.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Corpus {
	name: String,
	sentences: Vec<Vec<String>>,
}

impl Corpus {
	/// Tokenizes every non-blank line into a sentence.
	pub fn from_lines<I, S>(name: &str, lines: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let sentences = lines
			.into_iter()
			.map(|line| tokenize(line.as_ref()))
			.filter(|sentence| !sentence.is_empty())
			.collect();
		Self { name: name.to_owned(), sentences }
	}

	/// Loads a corpus, building its binary cache if it is missing or stale.
	///
	/// - `filepath` is the input text file.
	/// - Uses `postcard` for compact serialization/deserialization.
	///
	/// Calling this repeatedly is cheap and always yields the same corpus.
	/// A corrupt cache is replaced when the text file is still available.
	pub fn load<P: AsRef<Path>>(filepath: P) -> Result<Self> {
		let filepath = filepath.as_ref();
		let binary_data_path = cache_path(filepath)?;

		if is_cache_fresh(filepath, &binary_data_path) {
			info!("Loading cached corpus {}", binary_data_path.display());
			let bytes = fs::read(&binary_data_path)?;
			match postcard::from_bytes(&bytes) {
				Ok(corpus) => return Ok(corpus),
				// Without the text file there is nothing to rebuild from
				Err(e) if !filepath.exists() => return Err(e.into()),
				Err(e) => warn!("Unreadable cache {} ({e}), rebuilding it", binary_data_path.display()),
			}
		}

		info!("Tokenizing corpus {}...", filepath.display());
		let lines = read_lines(filepath)?.collect::<std::io::Result<Vec<String>>>()?;
		let corpus = Self::from_lines(&corpus_name(filepath)?, lines);

		let bytes = postcard::to_stdvec(&corpus)?;
		fs::write(&binary_data_path, bytes)?;
		info!(
			"Corpus ready: {} sentences, {} tokens (cached to {})",
			corpus.len(),
			corpus.token_count(),
			binary_data_path.display()
		);

		Ok(corpus)
	}

	/// Corpus name, derived from the file name for loaded corpora.
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn sentences(&self) -> &[Vec<String>] {
		&self.sentences
	}

	/// Number of sentences.
	pub fn len(&self) -> usize {
		self.sentences.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sentences.is_empty()
	}

	/// Total number of tokens over all sentences.
	pub fn token_count(&self) -> usize {
		self.sentences.iter().map(Vec::len).sum()
	}

	/// Builds the vocabulary of the whole corpus.
	pub fn vocabulary(&self, cutoff: usize) -> Vocabulary {
		let vocabulary = Vocabulary::from_sentences(&self.sentences, cutoff);
		info!("Vocabulary built: {} known tokens (cutoff {})", vocabulary.len(), cutoff);
		vocabulary
	}
}

/// `true` if the cache exists and the source is absent or not newer.
fn is_cache_fresh(source: &Path, cache: &Path) -> bool {
	let Ok(cache_meta) = fs::metadata(cache) else {
		return false;
	};
	let Ok(source_meta) = fs::metadata(source) else {
		return true;
	};
	match (source_meta.modified(), cache_meta.modified()) {
		(Ok(source_time), Ok(cache_time)) => source_time <= cache_time,
		_ => false,
	}
}

/// Splits raw text into lowercase word tokens.
///
/// - Whitespace separates tokens
/// - Punctuation becomes a token of its own (`"barco."` → `"barco"`, `"."`)
/// - Apostrophes and hyphens inside a word are kept (`"don't"`, `"well-known"`)
/// - Dots and commas between digits are kept (`"3.5"`, `"1,000"`)
pub fn tokenize(text: &str) -> Vec<String> {
	let mut tokens = Vec::new();

	for chunk in text.split_whitespace() {
		let chars: Vec<char> = chunk.chars().collect();
		let mut word = String::new();

		for (i, c) in chars.iter().copied().enumerate() {
			let next = chars.get(i + 1).copied();
			let prev = i.checked_sub(1).and_then(|p| chars.get(p)).copied();

			let joins_word = c.is_alphanumeric()
				|| ((c == '\'' || c == '-') && !word.is_empty() && next.is_some_and(char::is_alphanumeric))
				|| ((c == '.' || c == ',')
					&& prev.is_some_and(|p| p.is_ascii_digit())
					&& next.is_some_and(|n| n.is_ascii_digit())
					&& !word.is_empty());

			if joins_word {
				word.extend(c.to_lowercase());
			} else {
				if !word.is_empty() {
					tokens.push(std::mem::take(&mut word));
				}
				tokens.push(c.to_string());
			}
		}

		if !word.is_empty() {
			tokens.push(word);
		}
	}

	tokens
}
