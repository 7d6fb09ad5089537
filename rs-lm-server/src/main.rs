use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{get, put, web, App, HttpResponse, HttpServer, Responder};

use log::info;
use serde::Deserialize;

use rs_lm_core::io::list_files;
use rs_lm_core::model::vocabulary::START_TOKEN;
use rs_lm_core::{tokenize, Corpus, GenerationInput, LmConfig, LmError, NGramModel};

/// Largest `num_tokens` accepted by `/v1/generate`.
const MAX_NUM_TOKENS: usize = 10_000;

/// Struct representing query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	num_tokens: Option<usize>,
	seed: Option<String>,
	filter: Option<bool>,
	random_seed: Option<u64>,
}

/// Query parameters of the scoring endpoints
#[derive(Deserialize)]
struct SentenceQuery {
	sentence: String,
}

/// Query parameters of `/v1/load_corpus`; missing settings use `LmConfig::default()`
#[derive(Deserialize)]
struct CorpusQuery {
	name: Option<String>,
	order: Option<usize>,
	gamma: Option<f64>,
	unk_cutoff: Option<usize>,
}

/// Model currently served. Handlers clone the `Arc` and release the lock
/// before doing any work with it.
struct SharedData {
	corpus_name: String,
	model: Arc<NGramModel>,
}

/// Directory holding the corpus files.
struct DataDir(PathBuf);

impl GenerateParams {
	/// Builds the generation request for a model of order `order`.
	///
	/// Without a seed, generation starts from `order - 1` start tokens.
	fn input(&self, order: usize) -> Result<GenerationInput, String> {
		let num_tokens = self.num_tokens.unwrap_or(10);
		if num_tokens > MAX_NUM_TOKENS {
			return Err(format!("num_tokens must be at most {MAX_NUM_TOKENS}, got {num_tokens}"));
		}

		let start = vec![START_TOKEN; order.saturating_sub(1)];
		let mut input = GenerationInput::new(num_tokens, &start);
		if let Some(text) = &self.seed {
			input.set_seed(&tokenize(text)).map_err(|e| e.to_string())?;
		}
		input.filter_reserved = self.filter.unwrap_or(true);
		input.random_seed = self.random_seed;
		Ok(input)
	}
}

impl CorpusQuery {
	fn config(&self) -> LmConfig {
		let defaults = LmConfig::default();
		LmConfig {
			order: self.order.unwrap_or(defaults.order),
			gamma: self.gamma.unwrap_or(defaults.gamma),
			unk_cutoff: self.unk_cutoff.unwrap_or(defaults.unk_cutoff),
		}
	}
}

/// Maps a model error to an HTTP response.
///
/// Caller mistakes are reported as bad requests, anything else as a server error.
fn error_response(e: LmError) -> HttpResponse {
	match e {
		LmError::InvalidSeed { .. } | LmError::InvalidOrder(_) | LmError::InvalidGamma(_) | LmError::InvalidConfig(_) => {
			HttpResponse::BadRequest().body(e.to_string())
		}
		_ => HttpResponse::InternalServerError().body(e.to_string()),
	}
}

/// Path of the text file of corpus `name` inside `data_dir`.
///
/// Only plain file names are accepted: no separators, no `..`, nothing absolute.
fn corpus_file(data_dir: &Path, name: &str) -> Result<PathBuf, LmError> {
	let plain = !name.contains(['/', '\\']) && Path::new(name).file_name() == Some(OsStr::new(name));
	if !plain {
		return Err(LmError::InvalidConfig(format!("invalid corpus name '{name}'")));
	}
	Ok(data_dir.join(format!("{name}.txt")))
}

/// Loads a corpus from `data_dir` and trains a model on it.
fn train_model(data_dir: &Path, name: &str, config: &LmConfig) -> Result<NGramModel, LmError> {
	config.validate()?;
	let corpus = Corpus::load(corpus_file(data_dir, name)?)?;
	let mut model = NGramModel::from_config(config)?;
	model.fit(corpus.sentences(), corpus.vocabulary(config.unk_cutoff))?;
	Ok(model)
}

/// Corpus name and model currently served.
fn snapshot(data: &RwLock<SharedData>) -> Result<(String, Arc<NGramModel>), HttpResponse> {
	match data.read() {
		Ok(shared_data) => Ok((shared_data.corpus_name.clone(), Arc::clone(&shared_data.model))),
		Err(_) => Err(HttpResponse::InternalServerError().body("Model lock failed")),
	}
}

///
/// Generates tokens from the current model based on query parameters.
/// Returns the generated tokens joined by spaces as the response body.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<RwLock<SharedData>>, query: web::Query<GenerateParams>) -> impl Responder {
	let model = match snapshot(&data) {
		Ok((_, model)) => model,
		Err(response) => return response,
	};

	let input = match query.input(model.order()) {
		Ok(input) => input,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};

	match web::block(move || model.generate_with(&input)).await {
		Ok(Ok(tokens)) => HttpResponse::Ok().body(tokens.join(" ")),
		Ok(Err(e)) => error_response(e),
		Err(e) => HttpResponse::InternalServerError().body(format!("Generation task failed: {e}")),
	}
}

#[get("/v1/logprob")]
async fn get_log_probability(data: web::Data<RwLock<SharedData>>, query: web::Query<SentenceQuery>) -> impl Responder {
	let model = match snapshot(&data) {
		Ok((_, model)) => model,
		Err(response) => return response,
	};

	match model.log_probability(&tokenize(&query.sentence)) {
		Ok(value) => HttpResponse::Ok().body(value.to_string()),
		Err(e) => error_response(e),
	}
}

#[get("/v1/perplexity")]
async fn get_perplexity(data: web::Data<RwLock<SharedData>>, query: web::Query<SentenceQuery>) -> impl Responder {
	let model = match snapshot(&data) {
		Ok((_, model)) => model,
		Err(response) => return response,
	};

	match model.perplexity(&tokenize(&query.sentence)) {
		Ok(value) => HttpResponse::Ok().body(value.to_string()),
		Err(e) => error_response(e),
	}
}

#[get("/v1/vocabulary")]
async fn get_vocabulary(data: web::Data<RwLock<SharedData>>) -> impl Responder {
	let (corpus_name, model) = match snapshot(&data) {
		Ok(snapshot) => snapshot,
		Err(response) => return response,
	};

	match model.vocabulary() {
		Ok(vocabulary) => HttpResponse::Ok().body(format!(
			"corpus: {}\norder: {}\ngamma: {}\ncutoff: {}\nsize: {}",
			corpus_name,
			model.order(),
			model.gamma(),
			vocabulary.cutoff(),
			vocabulary.len()
		)),
		Err(e) => error_response(e),
	}
}

#[get("/v1/corpora")]
async fn get_corpora(data_dir: web::Data<DataDir>) -> impl Responder {
	match list_files(&data_dir.0, "txt") {
		Ok(files) => HttpResponse::Ok().body(files.join("\n").replace(".txt", "")),
		Err(_) => HttpResponse::InternalServerError().body("Failed to list corpora"),
	}
}

/// Trains a new model on another corpus and swaps it in.
///
/// Training runs outside the lock; the write lock is only held for the swap,
/// so readers never observe a half-trained model.
#[put("/v1/load_corpus")]
async fn put_corpus(
	data: web::Data<RwLock<SharedData>>,
	data_dir: web::Data<DataDir>,
	query: web::Query<CorpusQuery>,
) -> impl Responder {
	let name = match &query.name {
		Some(s) if !s.trim().is_empty() => s.trim().to_owned(),
		_ => return HttpResponse::BadRequest().body("Missing or empty corpus name"),
	};
	let config = query.config();
	let data_dir = data_dir.into_inner();

	let trained = web::block(move || train_model(&data_dir.0, &name, &config).map(|model| (name, model))).await;
	let (name, model) = match trained {
		Ok(Ok(result)) => result,
		Ok(Err(e)) => return error_response(e),
		Err(e) => return HttpResponse::InternalServerError().body(format!("Training task failed: {e}")),
	};

	let mut shared_data = match data.write() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	info!("Serving model trained on corpus '{name}'");
	shared_data.corpus_name = name;
	shared_data.model = Arc::new(model);

	HttpResponse::Ok().body("Corpus loaded successfully")
}

fn routes(cfg: &mut web::ServiceConfig) {
	cfg.service(get_generated)
		.service(get_log_probability)
		.service(get_perplexity)
		.service(get_vocabulary)
		.service(get_corpora)
		.service(put_corpus);
}

/// Main entry point for the server.
///
/// Trains the initial model, wraps it in a `RwLock` so queries share it,
/// and starts an Actix-web HTTP server.
///
/// # Notes
/// - `RS_LM_DATA` is the corpus directory (default `./data`).
/// - `RS_LM_CORPUS` names the initial corpus in it (default `corpus`).
/// - `RS_LM_BIND` sets the address (default `127.0.0.1:5000`).
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init();

	let data_dir = env::var("RS_LM_DATA").unwrap_or_else(|_| "./data".to_owned());
	let corpus_name = env::var("RS_LM_CORPUS").unwrap_or_else(|_| "corpus".to_owned());
	let bind = env::var("RS_LM_BIND").unwrap_or_else(|_| "127.0.0.1:5000".to_owned());

	let data_dir = PathBuf::from(data_dir);
	let model = train_model(&data_dir, &corpus_name, &LmConfig::default()).map_err(std::io::Error::other)?;
	let shared_data = SharedData { corpus_name, model: Arc::new(model) };
	let shared_model = web::Data::new(RwLock::new(shared_data));
	let data_dir = web::Data::new(DataDir(data_dir));

	info!("Listening on {bind}");
	HttpServer::new(move || {
		App::new()
			.wrap(Logger::default())
			.wrap(Cors::permissive())
			.app_data(shared_model.clone())
			.app_data(data_dir.clone())
			.configure(routes)
	})
		.bind(bind)?
		.run()
		.await
}

#[cfg(test)]
mod tests {
	use std::fs;

	use actix_web::http::StatusCode;
	use actix_web::test;

	use super::*;

	/// Data directory with two corpora, and the shared state serving `corpus`.
	fn serve(config: &LmConfig) -> (tempfile::TempDir, web::Data<RwLock<SharedData>>, web::Data<DataDir>) {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("corpus.txt"), "the cat sat\nthe dog ran\nthe cat ran\n").unwrap();
		fs::write(dir.path().join("other.txt"), "in the house\nin the garden\nin the house again\nthe garden is big\n").unwrap();

		let model = train_model(dir.path(), "corpus", config).unwrap();
		let shared = web::Data::new(RwLock::new(SharedData { corpus_name: "corpus".to_owned(), model: Arc::new(model) }));
		let data_dir = web::Data::new(DataDir(dir.path().to_path_buf()));
		(dir, shared, data_dir)
	}

	#[::core::prelude::v1::test]
	fn generate_params_default_to_start_tokens() {
		let params = GenerateParams { num_tokens: None, seed: None, filter: None, random_seed: Some(3) };
		let input = params.input(3).unwrap();
		assert_eq!(input.num_tokens, 10);
		assert!(input.filter_reserved);
		assert_eq!(input.random_seed, Some(3));
		assert_eq!(input.seed(), &[START_TOKEN.to_owned(), START_TOKEN.to_owned()]);
	}

	#[::core::prelude::v1::test]
	fn seed_text_is_tokenized_and_blank_seed_rejected() {
		let params = GenerateParams { num_tokens: Some(5), seed: Some("In the".to_owned()), filter: Some(false), random_seed: None };
		let input = params.input(2).unwrap();
		assert_eq!(input.seed(), &["in".to_owned(), "the".to_owned()]);
		assert!(!input.filter_reserved);

		let params = GenerateParams { num_tokens: Some(5), seed: Some("   ".to_owned()), filter: None, random_seed: None };
		assert!(params.input(2).is_err());
	}

	#[::core::prelude::v1::test]
	fn num_tokens_is_bounded() {
		let params = GenerateParams { num_tokens: Some(MAX_NUM_TOKENS), seed: None, filter: None, random_seed: None };
		assert!(params.input(2).is_ok());

		let params = GenerateParams { num_tokens: Some(usize::MAX), seed: None, filter: None, random_seed: None };
		assert!(params.input(2).is_err());
	}

	#[::core::prelude::v1::test]
	fn corpus_query_fills_missing_settings() {
		let query = CorpusQuery { name: Some("brown".to_owned()), order: Some(3), gamma: None, unk_cutoff: None };
		assert_eq!(query.config(), LmConfig { order: 3, ..LmConfig::default() });
	}

	#[::core::prelude::v1::test]
	fn corpus_names_stay_inside_data_dir() {
		let data_dir = Path::new("./data");
		assert_eq!(corpus_file(data_dir, "brown").unwrap(), data_dir.join("brown.txt"));
		assert_eq!(corpus_file(data_dir, "brown.v2").unwrap(), data_dir.join("brown.v2.txt"));

		for name in ["../secret", "..", ".", "/etc/passwd", "a/b", "a\\b", ""] {
			assert!(matches!(corpus_file(data_dir, name), Err(LmError::InvalidConfig(_))), "{name}");
		}
	}

	#[::core::prelude::v1::test]
	fn contract_errors_are_bad_requests() {
		let response = error_response(LmError::InvalidSeed { required: 2, got: 1 });
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
		let response = error_response(LmError::InvalidConfig("invalid corpus name '..'".to_owned()));
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
		let response = error_response(LmError::NotTrained("text generation"));
		assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	}

	#[actix_web::test]
	async fn generate_endpoint_checks_seed_and_size() {
		let config = LmConfig { order: 3, unk_cutoff: 1, ..LmConfig::default() };
		let (_dir, shared, data_dir) = serve(&config);
		let app = test::init_service(App::new().app_data(shared).app_data(data_dir).configure(routes)).await;

		let request = test::TestRequest::get().uri("/v1/generate?num_tokens=4&filter=false&random_seed=7").to_request();
		let response = test::call_service(&app, request).await;
		assert_eq!(response.status(), StatusCode::OK);
		let body = test::read_body(response).await;
		assert_eq!(std::str::from_utf8(&body).unwrap().split(' ').count(), 4);

		let request = test::TestRequest::get().uri("/v1/generate?seed=the").to_request();
		assert_eq!(test::call_service(&app, request).await.status(), StatusCode::BAD_REQUEST);

		let request = test::TestRequest::get().uri("/v1/generate?num_tokens=18446744073709551615").to_request();
		assert_eq!(test::call_service(&app, request).await.status(), StatusCode::BAD_REQUEST);
	}

	#[actix_web::test]
	async fn empty_sentence_has_zero_perplexity() {
		let (_dir, shared, data_dir) = serve(&LmConfig::default());
		let app = test::init_service(App::new().app_data(shared).app_data(data_dir).configure(routes)).await;

		let request = test::TestRequest::get().uri("/v1/perplexity?sentence=").to_request();
		assert_eq!(test::call_and_read_body(&app, request).await, "0");

		let request = test::TestRequest::get().uri("/v1/logprob?sentence=the%20cat").to_request();
		let body = test::call_and_read_body(&app, request).await;
		let log_probability: f64 = std::str::from_utf8(&body).unwrap().parse().unwrap();
		assert!(log_probability < 0.0);
	}

	#[actix_web::test]
	async fn load_corpus_swaps_the_served_model() {
		let (dir, shared, data_dir) = serve(&LmConfig::default());
		let app = test::init_service(App::new().app_data(shared).app_data(data_dir).configure(routes)).await;

		let request = test::TestRequest::get().uri("/v1/vocabulary").to_request();
		let before = test::call_and_read_body(&app, request).await;
		assert!(std::str::from_utf8(&before).unwrap().starts_with("corpus: corpus\norder: 2\n"));

		let request = test::TestRequest::put().uri("/v1/load_corpus?name=other&order=3&unk_cutoff=1").to_request();
		assert_eq!(test::call_service(&app, request).await.status(), StatusCode::OK);

		let request = test::TestRequest::get().uri("/v1/vocabulary").to_request();
		let after = test::call_and_read_body(&app, request).await;
		let after = std::str::from_utf8(&after).unwrap();
		assert!(after.starts_with("corpus: other\norder: 3\n"));
		// in, the, house, garden, again, is, big + <s>, </s>, <UNK>
		assert!(after.ends_with("cutoff: 1\nsize: 10"));

		let request = test::TestRequest::get().uri("/v1/corpora").to_request();
		assert_eq!(test::call_and_read_body(&app, request).await, "corpus\nother");
		assert!(dir.path().join("other.bin").exists());
	}

	#[actix_web::test]
	async fn load_corpus_rejects_paths_outside_data_dir() {
		let (dir, shared, _) = serve(&LmConfig::default());
		let data = dir.path().join("data");
		fs::create_dir(&data).unwrap();
		fs::copy(dir.path().join("corpus.txt"), data.join("corpus.txt")).unwrap();
		let data_dir = web::Data::new(DataDir(data));
		let app = test::init_service(App::new().app_data(shared).app_data(data_dir).configure(routes)).await;

		for name in ["..%2Fother", "%2Ftmp%2Fother", ".."] {
			let request = test::TestRequest::put().uri(&format!("/v1/load_corpus?name={name}")).to_request();
			assert_eq!(test::call_service(&app, request).await.status(), StatusCode::BAD_REQUEST, "{name}");
		}
		assert!(!dir.path().join("other.bin").exists());

		let request = test::TestRequest::get().uri("/v1/vocabulary").to_request();
		let body = test::call_and_read_body(&app, request).await;
		assert!(std::str::from_utf8(&body).unwrap().starts_with("corpus: corpus\n"));
	}
}
