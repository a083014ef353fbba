//! Fixed-priority answer cascade.
//!
//! 1. precomputed: trigger match in the canned table, no retrieval
//! 2. retrieval_generated: evidence found and the generator returned text
//! 3. template_fallback: no evidence, or generation failed/timed out/was empty
//! 4. error_fallback: anything unexpected escaping 1-3, panics included

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use tutor_core::config::AppConfig;
use tutor_core::error::{Error, Result};
use tutor_core::{Evidence, GenerationRequest, Generator, Strategy, Subject, SynthesisResponse};

use crate::confidence::ConfidenceEstimator;
use crate::precomputed::PrecomputedTable;
use crate::prompt::{build_context, build_prompt, clean_response};
use crate::subject::detect_subject;
use crate::templates::Templates;

struct Outcome {
    answer: String,
    strategy: Strategy,
    subject: Subject,
    evidence: Vec<Evidence>,
    model: Option<String>,
}

pub struct Cascade {
    precomputed: Option<PrecomputedTable>,
    templates: Templates,
    generator: Arc<dyn Generator>,
    confidence: ConfidenceEstimator,
    temperature: f32,
    max_tokens: u32,
    max_context_docs: usize,
    max_context_chars: usize,
}

impl Cascade {
    pub fn new(
        precomputed: Option<PrecomputedTable>,
        templates: Templates,
        generator: Arc<dyn Generator>,
        config: &AppConfig,
    ) -> Self {
        Self {
            precomputed,
            templates,
            generator,
            confidence: ConfidenceEstimator::new(config.confidence.clone()),
            temperature: config.generation.temperature,
            max_tokens: config.generation.max_tokens,
            max_context_docs: config.retrieval.max_context_docs,
            max_context_chars: config.retrieval.max_context_chars,
        }
    }

    pub fn generator_id(&self) -> &str {
        self.generator.id()
    }

    pub fn precomputed_entries(&self) -> usize {
        self.precomputed.as_ref().map_or(0, PrecomputedTable::len)
    }

    /// Answer `query`. `retrieve` runs only when no canned answer matched.
    ///
    /// Never fails and never unwinds into the caller.
    pub fn answer<F>(&self, query: &str, retrieve: F) -> SynthesisResponse
    where
        F: FnOnce(&str) -> Result<Vec<Evidence>>,
    {
        self.answer_with(query, None, retrieve)
    }

    /// [`Cascade::answer`] with an optional per-call sampling temperature.
    pub fn answer_with<F>(&self, query: &str, temperature: Option<f32>, retrieve: F) -> SynthesisResponse
    where
        F: FnOnce(&str) -> Result<Vec<Evidence>>,
    {
        let started = Instant::now();
        let temperature = temperature.filter(|t| t.is_finite() && *t >= 0.0).unwrap_or(self.temperature);
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| self.run(query, temperature, retrieve))) {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "answer cascade failed");
                self.error_outcome(query)
            }
            Err(_) => {
                tracing::error!("answer cascade panicked");
                self.error_outcome(query)
            }
        };

        let distances: Vec<f32> = outcome.evidence.iter().map(|e| e.distance).collect();
        let confidence = self.confidence.estimate(outcome.strategy, &distances);
        let processing_time = started.elapsed().as_secs_f64();
        tracing::info!(
            strategy = %outcome.strategy,
            subject = outcome.subject.name(),
            evidence = outcome.evidence.len(),
            confidence,
            elapsed_ms = (processing_time * 1000.0) as u64,
            "answered"
        );

        SynthesisResponse {
            answer: outcome.answer,
            confidence,
            evidence: outcome.evidence,
            strategy_used: outcome.strategy,
            subject: outcome.subject,
            processing_time,
            model_used: outcome.model,
        }
    }

    fn run<F>(&self, query: &str, temperature: f32, retrieve: F) -> Result<Outcome>
    where
        F: FnOnce(&str) -> Result<Vec<Evidence>>,
    {
        if let Some(entry) = self.precomputed.as_ref().and_then(|t| t.lookup(query)) {
            tracing::debug!(key = %entry.key, "precomputed answer");
            return Ok(Outcome {
                answer: entry.answer.clone(),
                strategy: Strategy::Precomputed,
                subject: entry.subject,
                evidence: Vec::new(),
                model: None,
            });
        }

        let subject = detect_subject(query);
        let evidence = match retrieve(query) {
            Ok(evidence) => evidence,
            Err(Error::Provider(e)) => {
                tracing::warn!(error = %e, "retrieval unavailable; answering without evidence");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        if evidence.is_empty() {
            return Ok(self.template_outcome(query, subject, evidence));
        }

        let context = build_context(&evidence, self.max_context_docs, self.max_context_chars);
        let request = GenerationRequest {
            prompt: build_prompt(query, &context),
            temperature,
            max_tokens: self.max_tokens,
        };
        match self.generator.generate_attributed(&request) {
            Ok(generation) if !generation.text.trim().is_empty() => Ok(Outcome {
                answer: clean_response(&generation.text),
                strategy: Strategy::RetrievalGenerated,
                subject,
                evidence,
                model: Some(generation.model),
            }),
            Ok(_) => {
                tracing::warn!(generator = self.generator.id(), "empty generation; using template");
                Ok(self.template_outcome(query, subject, evidence))
            }
            Err(e) => {
                tracing::warn!(generator = self.generator.id(), error = %e, "generation failed; using template");
                Ok(self.template_outcome(query, subject, evidence))
            }
        }
    }

    fn template_outcome(&self, query: &str, subject: Subject, evidence: Vec<Evidence>) -> Outcome {
        Outcome {
            answer: self.templates.render_fallback(query, subject, &evidence),
            strategy: Strategy::TemplateFallback,
            subject,
            evidence,
            model: None,
        }
    }

    fn error_outcome(&self, query: &str) -> Outcome {
        Outcome {
            answer: self.templates.render_error(query),
            strategy: Strategy::ErrorFallback,
            subject: detect_subject(query),
            evidence: Vec::new(),
            model: None,
        }
    }
}
