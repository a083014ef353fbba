use std::cell::Cell;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tutor_answer::{AskOptions, Assistant, Cascade, PrecomputedTable, Templates};
use tutor_core::config::AppConfig;
use tutor_core::{
    DocumentChunk, Error, Evidence, GenerationRequest, Generator, ProviderError, Strategy, Subject,
};
use tutor_embed::HashEmbedder;

enum Script {
    Reply(&'static str),
    Fail(ProviderError),
    Panic,
}

/// Generator that plays back a fixed behaviour and remembers the last request.
struct Scripted {
    script: Script,
    last_request: Mutex<Option<GenerationRequest>>,
}

impl Scripted {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self { script, last_request: Mutex::new(None) })
    }
}

impl Generator for Scripted {
    fn id(&self) -> &str {
        "scripted"
    }

    fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        *self.last_request.lock().unwrap() = Some(request.clone());
        match &self.script {
            Script::Reply(text) => Ok((*text).to_string()),
            Script::Fail(e) => Err(e.clone()),
            Script::Panic => panic!("generator blew up"),
        }
    }
}

fn cascade(generator: Arc<Scripted>) -> Cascade {
    Cascade::new(Some(PrecomputedTable::builtin()), Templates::default(), generator, &AppConfig::default())
}

fn photosynthesis_evidence() -> Vec<Evidence> {
    vec![
        Evidence {
            chunk: DocumentChunk::new(
                "Photosynthesis converts light energy into chemical energy stored in glucose.",
                "biology.pdf",
                "Biology",
            ),
            distance: 0.4,
            score: 0.8,
        },
        Evidence {
            chunk: DocumentChunk::new("Chlorophyll absorbs mostly red and blue light.", "plants.pdf", "Biology"),
            distance: 0.7,
            score: 0.6,
        },
    ]
}

#[test]
fn ohms_law_is_answered_from_the_table_without_retrieval() {
    let c = cascade(Scripted::new(Script::Panic));
    let called = Cell::new(false);
    let resp = c.answer("Explain Ohm's law", |_| {
        called.set(true);
        Ok(photosynthesis_evidence())
    });
    assert!(!called.get(), "retrieval must not run for a canned answer");
    assert_eq!(resp.strategy_used, Strategy::Precomputed);
    assert_eq!(resp.subject, Subject::Electrical);
    assert!(resp.answer.contains("U = R × I"));
    assert!(resp.evidence.is_empty());
    assert!((resp.confidence - 0.9).abs() < 1e-6);
}

#[test]
fn no_evidence_means_template_never_generation() {
    let generator = Scripted::new(Script::Reply("should not be used"));
    let c = cascade(generator.clone());
    let resp = c.answer("How does photosynthesis work?", |_| Ok(Vec::new()));
    assert_eq!(resp.strategy_used, Strategy::TemplateFallback);
    assert_eq!(resp.subject, Subject::Biology);
    assert!(resp.model_used.is_none());
    assert!(resp.answer.contains("How does photosynthesis work?"));
    assert!((resp.confidence - 0.35).abs() < 1e-6);
    assert!(generator.last_request.lock().unwrap().is_none());
}

#[test]
fn provider_failure_during_retrieval_degrades_to_template() {
    let c = cascade(Scripted::new(Script::Reply("unused")));
    let resp = c.answer("How does photosynthesis work?", |_| {
        Err(Error::Provider(ProviderError::Unavailable("embedding server down".into())))
    });
    assert_eq!(resp.strategy_used, Strategy::TemplateFallback);
    assert!(resp.evidence.is_empty());
}

#[test]
fn generation_failures_fall_back_to_template_with_evidence() {
    for script in [
        Script::Fail(ProviderError::Unavailable("connection refused".into())),
        Script::Fail(ProviderError::Timeout(Duration::from_secs(30))),
        Script::Reply("   \n "),
    ] {
        let c = cascade(Scripted::new(script));
        let resp = c.answer("How does photosynthesis work?", |_| Ok(photosynthesis_evidence()));
        assert_eq!(resp.strategy_used, Strategy::TemplateFallback);
        assert_eq!(resp.evidence.len(), 2);
        assert!(resp.answer.contains("Photosynthesis converts light energy"));
        assert!(resp.answer.contains("biology.pdf, plants.pdf"));
        assert!((resp.confidence - 0.35).abs() < 1e-6);
    }
}

#[test]
fn generated_answer_is_grounded_in_the_evidence() {
    let generator = Scripted::new(Script::Reply("  Light is turned into sugar.  "));
    let c = cascade(generator.clone());
    let resp = c.answer("How does photosynthesis work?", |_| Ok(photosynthesis_evidence()));

    assert_eq!(resp.strategy_used, Strategy::RetrievalGenerated);
    assert_eq!(resp.answer, "Light is turned into sugar.");
    assert_eq!(resp.evidence.len(), 2);
    assert!(resp.confidence > 0.0 && resp.confidence <= 1.0);
    assert!(resp.processing_time >= 0.0);

    assert_eq!(resp.model_used.as_deref(), Some("scripted"));
    let prompt = generator.last_request.lock().unwrap().clone().unwrap().prompt;
    assert!(prompt.contains("[Source: biology.pdf]"));
    assert!(prompt.contains("How does photosynthesis work?"));
}

#[test]
fn unexpected_failures_end_in_error_fallback() {
    let c = cascade(Scripted::new(Script::Reply("unused")));
    let resp = c.answer("How does photosynthesis work?", |_| Err(Error::Configuration("bad index".into())));
    assert_eq!(resp.strategy_used, Strategy::ErrorFallback);
    assert!((resp.confidence - 0.1).abs() < 1e-6);
    assert!(resp.answer.contains("How does photosynthesis work?"));

    let resp = c.answer("How does photosynthesis work?", |_| panic!("retrieval bug"));
    assert_eq!(resp.strategy_used, Strategy::ErrorFallback);

    let c = cascade(Scripted::new(Script::Panic));
    let resp = c.answer("How does photosynthesis work?", |_| Ok(photosynthesis_evidence()));
    assert_eq!(resp.strategy_used, Strategy::ErrorFallback);
    assert!(resp.evidence.is_empty());
}

fn assistant(dir: &std::path::Path, generator: Arc<Scripted>, mut config: AppConfig) -> Assistant {
    config.index.dir = dir.join("index").display().to_string();
    Assistant::with_providers(config, dir, Arc::new(HashEmbedder::new(384)), generator).unwrap()
}

fn corpus() -> Vec<DocumentChunk> {
    vec![
        DocumentChunk::new(
            "Photosynthesis converts light energy into chemical energy stored in glucose.",
            "biology.pdf",
            "Biology",
        ),
        DocumentChunk::new("Newton's second law: force equals mass times acceleration.", "mechanics.pdf", "Physics"),
        DocumentChunk::new("A sorting algorithm orders the elements of a list.", "algorithms.pdf", "Computing"),
    ]
}

#[test]
fn empty_corpus_answers_with_template() {
    let tmp = tempfile::TempDir::new().unwrap();
    let a = assistant(tmp.path(), Scripted::new(Script::Reply("unused")), AppConfig::default());
    assert!(!a.load_if_present());
    let resp = a.ask("How does photosynthesis work?");
    assert_eq!(resp.strategy_used, Strategy::TemplateFallback);
    assert!(resp.evidence.is_empty());
}

#[test]
fn assistant_end_to_end_with_saved_index() {
    let tmp = tempfile::TempDir::new().unwrap();
    let builder = assistant(tmp.path(), Scripted::new(Script::Reply("unused")), AppConfig::default());
    let report = builder.rebuild(corpus()).unwrap();
    assert_eq!(report.indexed, 3);
    builder.save().unwrap();

    let a = assistant(tmp.path(), Scripted::new(Script::Reply("Plants turn light into glucose.")), AppConfig::default());
    assert!(a.load_if_present());
    assert_eq!(a.stats().total_vectors, 3);

    let resp = a.ask("How does photosynthesis store light energy?");
    assert_eq!(resp.strategy_used, Strategy::RetrievalGenerated);
    assert_eq!(resp.subject, Subject::Biology);
    assert_eq!(resp.evidence.len(), 3);
    assert_eq!(resp.evidence[0].chunk.source(), Some("biology.pdf"));
    assert!(resp.evidence.windows(2).all(|w| w[0].score >= w[1].score));

    let status = a.status();
    assert_eq!(status.index.total_vectors, 3);
    assert_eq!(status.generator, "scripted");
    assert_eq!(status.embedder, "hash:xxh64:d384");
    assert_eq!(status.precomputed_entries, 4);
}

#[test]
fn disabled_table_sends_canned_questions_through_retrieval() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.precomputed.enabled = false;
    let a = assistant(tmp.path(), Scripted::new(Script::Reply("unused")), config);
    assert_eq!(a.status().precomputed_entries, 0);
    let resp = a.ask("Explain Ohm's law");
    assert_eq!(resp.strategy_used, Strategy::TemplateFallback);
    assert_eq!(resp.subject, Subject::Electrical);
}

#[test]
fn answers_file_overrides_table_and_templates() {
    let tmp = tempfile::TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("answers.toml"),
        r#"
        [[entries]]
        key = "mitosis"
        subject = "biology"
        triggers = ["mitosis"]
        answer = "Cell division into two identical cells."

        [templates]
        no_evidence = "Nothing indexed for: {question}"
        "#,
    )
    .unwrap();
    let mut config = AppConfig::default();
    config.precomputed.file = Some("answers.toml".into());
    let a = assistant(tmp.path(), Scripted::new(Script::Reply("unused")), config);

    let canned = a.ask("What is mitosis?");
    assert_eq!(canned.strategy_used, Strategy::Precomputed);
    assert_eq!(canned.answer, "Cell division into two identical cells.");

    let fallback = a.ask("Explain Ohm's law");
    assert_eq!(fallback.strategy_used, Strategy::TemplateFallback);
    assert_eq!(fallback.answer, "Nothing indexed for: Explain Ohm's law");
}

#[test]
fn missing_answers_file_is_a_configuration_error() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.precomputed.file = Some("absent.toml".into());
    config.index.dir = tmp.path().join("index").display().to_string();
    let err = Assistant::with_providers(
        config,
        tmp.path(),
        Arc::new(HashEmbedder::new(384)),
        Scripted::new(Script::Reply("unused")),
    )
    .err()
    .unwrap();
    assert!(err.is_configuration());
}

#[test]
fn derivative_question_is_answered_from_the_math_chunk() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.retrieval.top_k = 1;
    let a = assistant(tmp.path(), Scripted::new(Script::Reply("Bring the exponent down.")), config);
    a.rebuild(vec![
        DocumentChunk::new("Ohm's law: U=R×I", "electro.txt", "Physics"),
        DocumentChunk::new("Derivative rules: (x^n)'=nx^(n-1)", "calculus.txt", "Math"),
    ])
    .unwrap();

    let resp = a.ask("What is the derivative rule?");
    assert_eq!(resp.strategy_used, Strategy::RetrievalGenerated);
    assert_eq!(resp.subject, Subject::Mathematics);
    assert_eq!(resp.evidence.len(), 1);
    assert_eq!(resp.evidence[0].chunk.subject(), "Math");
    assert_eq!(resp.model_used.as_deref(), Some("scripted"));
}

#[test]
fn subject_filter_skips_the_nearest_chunk_of_another_subject() {
    let tmp = tempfile::TempDir::new().unwrap();
    let a = assistant(tmp.path(), Scripted::new(Script::Reply("Physics view.")), AppConfig::default());
    a.rebuild(corpus()).unwrap();
    let question = "How does photosynthesis store light energy?";

    let unfiltered = a.ask(question);
    assert_eq!(unfiltered.evidence[0].chunk.subject(), "Biology");

    let options = AskOptions { subject: Some("physics".into()), top_k: Some(1), ..Default::default() };
    let filtered = a.ask_with(question, &options);
    assert_eq!(filtered.strategy_used, Strategy::RetrievalGenerated);
    assert_eq!(filtered.evidence.len(), 1);
    assert_eq!(filtered.evidence[0].chunk.source(), Some("mechanics.pdf"));

    let none = a.ask_with(question, &AskOptions { subject: Some("Chemistry".into()), ..Default::default() });
    assert_eq!(none.strategy_used, Strategy::TemplateFallback);
    assert!(none.evidence.is_empty());
}

#[test]
fn request_options_override_configuration() {
    let tmp = tempfile::TempDir::new().unwrap();
    let generator = Scripted::new(Script::Reply("Plants make sugar."));
    let a = assistant(tmp.path(), generator.clone(), AppConfig::default());
    a.rebuild(corpus()).unwrap();

    let options = AskOptions { top_k: Some(2), temperature: Some(0.7), rerank: Some(false), ..Default::default() };
    let resp = a.ask_with("How does photosynthesis store light energy?", &options);
    assert_eq!(resp.evidence.len(), 2);
    assert!(resp.evidence.windows(2).all(|w| w[0].distance <= w[1].distance));
    let request = generator.last_request.lock().unwrap().clone().unwrap();
    assert!((request.temperature - 0.7).abs() < 1e-6);

    a.ask("How does photosynthesis store light energy?");
    let request = generator.last_request.lock().unwrap().clone().unwrap();
    assert!((request.temperature - AppConfig::default().generation.temperature).abs() < 1e-6);
}

#[test]
fn huge_oversample_does_not_overflow() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.retrieval.oversample = usize::MAX;
    let a = assistant(tmp.path(), Scripted::new(Script::Reply("Plants make sugar.")), config);
    a.rebuild(corpus()).unwrap();
    let resp = a.ask("How does photosynthesis store light energy?");
    assert_eq!(resp.strategy_used, Strategy::RetrievalGenerated);
    assert_eq!(resp.evidence.len(), 3);
}
