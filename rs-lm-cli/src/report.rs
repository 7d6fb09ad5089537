//! Plain-text reports printed and saved by the CLI tasks.

const WIDTH: usize = 60;

/// Results of the generation task.
pub struct GenerationReport<'a> {
	pub order: usize,
	pub seed: &'a str,
	pub generated: &'a [String],
	pub test_sentence: &'a str,
	pub log_probability: f64,
	pub probability: f64,
}

/// Results of the perplexity task.
pub struct PerplexityReport<'a> {
	pub order: usize,
	pub meaningful: &'a str,
	pub random: &'a str,
	pub perplexity_meaningful: f64,
	pub perplexity_random: f64,
}

fn model_name(order: usize) -> String {
	match order {
		2 => "bigram".to_owned(),
		3 => "trigram".to_owned(),
		n => format!("{n}-gram"),
	}
}

impl GenerationReport<'_> {
	pub fn render(&self) -> String {
		let mut full_sequence = self.seed.to_owned();
		for token in self.generated {
			full_sequence.push(' ');
			full_sequence.push_str(token);
		}

		let lines = [
			"=".repeat(WIDTH),
			format!("      Results of the {} language model", model_name(self.order)),
			"=".repeat(WIDTH),
			String::new(),
			"1. Text generation".to_owned(),
			"-".repeat(WIDTH),
			format!("- Seed: \"{}\"", self.seed),
			format!("- Generated sequence: \"{}\"", full_sequence),
			String::new(),
			"2. Sentence probability".to_owned(),
			"-".repeat(WIDTH),
			"- Test sentence:".to_owned(),
			format!("  \"{}\"", self.test_sentence),
			String::new(),
			format!("- Log-probability: {:.4}", self.log_probability),
			format!("- Probability: {:.4e}", self.probability),
			String::new(),
			"=".repeat(WIDTH),
		];
		lines.join("\n")
	}
}

impl PerplexityReport<'_> {
	pub fn render(&self) -> String {
		let lines = [
			"=".repeat(WIDTH),
			format!("  Perplexity of the {} model", model_name(self.order)),
			"=".repeat(WIDTH),
			String::new(),
			"1. Meaningful sentence".to_owned(),
			"-".repeat(WIDTH),
			format!("- Sentence: \"{}\"", self.meaningful),
			format!("- Perplexity: {:.4}", self.perplexity_meaningful),
			String::new(),
			"2. Meaningless (but grammatical) sentence".to_owned(),
			"-".repeat(WIDTH),
			format!("- Sentence: \"{}\"", self.random),
			format!("- Perplexity: {:.4}", self.perplexity_random),
			String::new(),
			"=".repeat(WIDTH),
		];
		lines.join("\n")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn generation_report_contains_full_sequence() {
		let generated = vec!["house".to_owned(), "of".to_owned()];
		let report = GenerationReport {
			order: 2,
			seed: "in the",
			generated: &generated,
			test_sentence: "the cat sat.",
			log_probability: -12.345678,
			probability: 0.000192,
		}
		.render();

		assert!(report.contains("bigram language model"));
		assert!(report.contains("- Generated sequence: \"in the house of\""));
		assert!(report.contains("- Log-probability: -12.3457"));
		assert!(report.contains("- Probability: 1.9200e-4"));
	}

	#[test]
	fn perplexity_report_lists_both_sentences() {
		let report = PerplexityReport {
			order: 4,
			meaningful: "the price of crude oil has risen sharply",
			random: "colorless green ideas sleep furiously",
			perplexity_meaningful: 321.5,
			perplexity_random: 4567.25,
		}
		.render();

		assert!(report.contains("4-gram model"));
		assert!(report.contains("- Perplexity: 321.5000"));
		assert!(report.contains("- Perplexity: 4567.2500"));
		assert!(report.starts_with(&"=".repeat(WIDTH)));
	}
}
