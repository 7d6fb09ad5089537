use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::info;
use rs_lm_core::io::write_report;
use rs_lm_core::{tokenize, Corpus, GenerationInput, LmConfig, NGramModel};

mod report;

use report::{GenerationReport, PerplexityReport};

const SEED_WORDS: &str = "in the";
const TEST_SENTENCE: &str = "detectives with his picture in hand were on the trail of cal barco.";
const MEANINGFUL_SENTENCE: &str = "the price of crude oil has risen sharply";
const RANDOM_SENTENCE: &str = "colorless green ideas sleep furiously";

#[derive(Parser, Debug)]
#[command(name = "rs-lm")]
#[command(about = "Train an n-gram language model on a corpus, then generate text or measure perplexity")]
#[command(version)]
struct Args {
	/// Generate text from a seed and score a test sentence
	#[arg(short = '1', long, conflicts_with = "perplexity")]
	generate: bool,

	/// Compare the perplexity of a meaningful and a random sentence (default task)
	#[arg(short = '2', long)]
	perplexity: bool,

	/// Corpus text file, one sentence per line
	#[arg(short, long, default_value = "./data/corpus.txt")]
	corpus: PathBuf,

	/// Path of the report file (parent directories are created)
	#[arg(short, long)]
	output: Option<PathBuf>,

	/// N-gram order
	#[arg(long, default_value_t = LmConfig::default().order)]
	order: usize,

	/// Lidstone smoothing pseudo-count
	#[arg(long, default_value_t = LmConfig::default().gamma)]
	gamma: f64,

	/// Minimum frequency for a token to stay out of <UNK>
	#[arg(long, default_value_t = LmConfig::default().unk_cutoff)]
	unk_cutoff: usize,

	/// Seed text for generation
	#[arg(long, default_value = SEED_WORDS)]
	seed_text: String,

	/// Number of tokens to generate
	#[arg(short, long, default_value_t = 10)]
	num_tokens: usize,

	/// Seed of the random generator, for reproducible output
	#[arg(long)]
	random_seed: Option<u64>,

	/// Keep <s>, </s> and <UNK> in the generated text
	#[arg(long)]
	keep_reserved: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Task {
	Generate,
	Perplexity,
}

impl Task {
	fn name(self) -> &'static str {
		match self {
			Task::Generate => "generate",
			Task::Perplexity => "perplexity",
		}
	}
}

impl Args {
	fn task(&self) -> Task {
		if self.generate { Task::Generate } else { Task::Perplexity }
	}

	fn config(&self) -> LmConfig {
		LmConfig { order: self.order, gamma: self.gamma, unk_cutoff: self.unk_cutoff }
	}

	fn output_path(&self) -> PathBuf {
		match &self.output {
			Some(path) => path.clone(),
			None => PathBuf::from("./results").join(format!("{}_results.txt", self.task().name())),
		}
	}
}

/// Loads the corpus and trains a model on it.
fn prepare_and_train_model(args: &Args) -> Result<NGramModel, Box<dyn std::error::Error>> {
	let config = args.config();
	config.validate()?;

	let corpus = Corpus::load(&args.corpus)?;
	let vocabulary = corpus.vocabulary(config.unk_cutoff);

	let mut model = NGramModel::from_config(&config)?;
	model.fit(corpus.sentences(), vocabulary)?;
	Ok(model)
}

fn run_generate(args: &Args, model: &NGramModel) -> Result<String, Box<dyn std::error::Error>> {
	let seed = tokenize(&args.seed_text);
	let mut input = GenerationInput::new(args.num_tokens, &seed);
	input.filter_reserved = !args.keep_reserved;
	input.random_seed = args.random_seed;
	let generated = model.generate_with(&input)?;

	let test_tokens = tokenize(TEST_SENTENCE);
	let log_probability = model.log_probability(&test_tokens)?;
	let probability = model.probability(&test_tokens)?;

	Ok(GenerationReport {
		order: model.order(),
		seed: &args.seed_text,
		generated: &generated,
		test_sentence: TEST_SENTENCE,
		log_probability,
		probability,
	}
	.render())
}

fn run_perplexity(model: &NGramModel) -> Result<String, Box<dyn std::error::Error>> {
	info!("Start measuring the perplexity of the model");
	let perplexity_meaningful = model.perplexity(&tokenize(MEANINGFUL_SENTENCE))?;
	let perplexity_random = model.perplexity(&tokenize(RANDOM_SENTENCE))?;
	info!("Model perplexity measured");

	Ok(PerplexityReport {
		order: model.order(),
		meaningful: MEANINGFUL_SENTENCE,
		random: RANDOM_SENTENCE,
		perplexity_meaningful,
		perplexity_random,
	}
	.render())
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
	let task = args.task();
	if args.generate || args.perplexity {
		println!("Executing task: {}...", task.name());
	} else {
		println!("No task specified. Running the default task: {}...", task.name());
	}

	let model = prepare_and_train_model(args)?;
	let results = match task {
		Task::Generate => run_generate(args, &model)?,
		Task::Perplexity => run_perplexity(&model)?,
	};
	println!("{results}");

	let output = args.output_path();
	write_report(&output, &results)?;
	println!("Results successfully saved to \"{}\"", output.display());
	Ok(())
}

fn main() -> ExitCode {
	env_logger::init();
	let args = Args::parse();

	match run(&args) {
		Ok(()) => {
			println!("Task {} completed successfully.", args.task().name());
			ExitCode::SUCCESS
		}
		Err(e) => {
			eprintln!("\nAn error occurred while executing task {}:", args.task().name());
			eprintln!("{e}");
			ExitCode::FAILURE
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_task_is_perplexity() {
		let args = Args::parse_from(["rs-lm"]);
		assert_eq!(args.task(), Task::Perplexity);
		assert_eq!(args.output_path(), PathBuf::from("./results/perplexity_results.txt"));
		assert_eq!(args.config(), LmConfig::default());
	}

	#[test]
	fn short_flags_select_tasks() {
		let args = Args::parse_from(["rs-lm", "-1", "-o", "out/report.txt", "--order", "3"]);
		assert_eq!(args.task(), Task::Generate);
		assert_eq!(args.output_path(), PathBuf::from("out/report.txt"));
		assert_eq!(args.config().order, 3);
	}

	#[test]
	fn tasks_are_mutually_exclusive() {
		assert!(Args::try_parse_from(["rs-lm", "-1", "-2"]).is_err());
	}

	#[test]
	fn generate_task_on_small_corpus() {
		let dir = tempfile::tempdir().unwrap();
		let corpus = dir.path().join("mini.txt");
		std::fs::write(&corpus, "in the house .\nin the garden .\nthe cat is in the house .\n").unwrap();

		let args = Args::parse_from([
			"rs-lm",
			"--generate",
			"--corpus",
			corpus.to_str().unwrap(),
			"--unk-cutoff",
			"1",
			"--random-seed",
			"4",
		]);
		let model = prepare_and_train_model(&args).unwrap();
		let report = run_generate(&args, &model).unwrap();
		assert!(report.contains("- Seed: \"in the\""));
		assert!(report.contains("- Log-probability: -"));
	}
}
