use common::domain::{DomainResult, LogEnvelope};

/// Derives the stored text from an envelope's original text
#[cfg_attr(test, mockall::automock)]
pub trait TextTransformer: Send + Sync {
    fn transform(&self, envelope: &LogEnvelope) -> DomainResult<String>;
}

/// Stores the text unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransformer;

impl TextTransformer for IdentityTransformer {
    fn transform(&self, envelope: &LogEnvelope) -> DomainResult<String> {
        Ok(envelope.text.clone())
    }
}
