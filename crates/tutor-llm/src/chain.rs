use tutor_core::{Generation, GenerationRequest, Generator, ProviderError};

/// Tries each generator in order and returns the first non-empty answer.
///
/// If nothing produced text, the result is `Ok("")` when at least one
/// generator answered empty, otherwise the last error.
pub struct GeneratorChain {
    generators: Vec<Box<dyn Generator>>,
    id: String,
}

impl GeneratorChain {
    pub fn new(generators: Vec<Box<dyn Generator>>) -> Self {
        let id = format!("chain[{}]", generators.iter().map(|g| g.id()).collect::<Vec<_>>().join(","));
        Self { generators, id }
    }
}

impl Generator for GeneratorChain {
    fn id(&self) -> &str {
        &self.id
    }

    fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        self.generate_attributed(request).map(|g| g.text)
    }

    fn generate_attributed(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        let mut answered_empty: Option<&str> = None;
        let mut last_error = ProviderError::Unavailable("no generators configured".into());
        for (attempt, generator) in self.generators.iter().enumerate() {
            match generator.generate_attributed(request) {
                Ok(generation) if !generation.text.trim().is_empty() => {
                    if attempt > 0 {
                        tracing::info!(model = %generation.model, attempt, "fallback model answered");
                    }
                    return Ok(generation);
                }
                Ok(_) => {
                    tracing::warn!(model = generator.id(), "model returned an empty answer");
                    answered_empty = Some(generator.id());
                }
                Err(e) => {
                    tracing::warn!(model = generator.id(), error = %e, "model failed");
                    last_error = e;
                }
            }
        }
        match answered_empty {
            Some(model) => Ok(Generation { text: String::new(), model: model.to_string() }),
            None => Err(last_error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Scripted {
        name: &'static str,
        reply: Result<&'static str, ProviderError>,
        calls: Arc<AtomicUsize>,
    }

    impl Generator for Scripted {
        fn id(&self) -> &str {
            self.name
        }
        fn generate(&self, _request: &GenerationRequest) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone().map(str::to_string)
        }
    }

    fn scripted(name: &'static str, reply: Result<&'static str, ProviderError>, calls: &Arc<AtomicUsize>) -> Box<dyn Generator> {
        Box::new(Scripted { name, reply, calls: calls.clone() })
    }

    fn request() -> GenerationRequest {
        GenerationRequest { prompt: "q".into(), temperature: 0.1, max_tokens: 10 }
    }

    #[test]
    fn falls_through_to_the_first_model_with_text() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = GeneratorChain::new(vec![
            scripted("a", Err(ProviderError::Request("500".into())), &calls),
            scripted("b", Ok("  "), &calls),
            scripted("c", Ok("answer"), &calls),
            scripted("d", Ok("unused"), &calls),
        ]);
        assert_eq!(chain.generate(&request()).unwrap(), "answer");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            chain.generate_attributed(&request()).unwrap(),
            Generation { text: "answer".into(), model: "c".into() }
        );
        assert_eq!(chain.id(), "chain[a,b,c,d]");
    }

    #[test]
    fn empty_answers_win_over_errors_when_nothing_succeeds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = GeneratorChain::new(vec![
            scripted("a", Ok(""), &calls),
            scripted("b", Err(ProviderError::Timeout(std::time::Duration::from_secs(1))), &calls),
        ]);
        assert_eq!(chain.generate(&request()).unwrap(), "");

        let failing = GeneratorChain::new(vec![scripted("a", Err(ProviderError::Unavailable("x".into())), &calls)]);
        assert_eq!(failing.generate(&request()), Err(ProviderError::Unavailable("x".into())));
        assert!(GeneratorChain::new(Vec::new()).generate(&request()).is_err());
    }
}
