//! The language-model capability agents depend on

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::types::Generation;
use crate::error::Result;

/// Boxed future returned by [`LanguageModel::generate`]
pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = Result<Generation>> + Send + 'a>>;

/// Anything that can turn a prompt into text
///
/// Implementations may fail with transport, timeout or rate-limit errors.
/// Agents never look behind this trait, so tests can script responses
/// without touching the network.
pub trait LanguageModel: Send + Sync {
    /// Identifier of the model answering prompts
    fn model_name(&self) -> &str;

    /// Generate a completion for a single prompt
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a>;
}

impl<T: LanguageModel + ?Sized> LanguageModel for Arc<T> {
    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a> {
        (**self).generate(prompt)
    }
}
