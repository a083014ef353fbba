use tutor_core::{GenerationRequest, Generator, ProviderError};

pub struct DisabledGenerator;

impl Generator for DisabledGenerator {
    fn id(&self) -> &str {
        "disabled"
    }

    fn generate(&self, _request: &GenerationRequest) -> Result<String, ProviderError> {
        Err(ProviderError::Unavailable("generation is disabled".into()))
    }
}
