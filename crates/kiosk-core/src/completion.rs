//! The completion backend trait.

use async_trait::async_trait;

use crate::error::Result;

/// A backend capable of answering a free-form question.
///
/// The HTTP layer talks to the upstream completion API exclusively through
/// this trait, which keeps handlers testable against a scripted backend.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Sends the prompt to the backend and returns the completion text.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable, rejects the request,
    /// or produces a response with no usable completion.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
