use std::error::Error;

use crate::error::ErrorKind;
use crate::handle::SessionHandle;
use crate::request::ModelRequest;
use crate::response::{GenerateResponse, ModelResponse};

/// The error type for a model provider.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// A type that represents a model provider, which is the entry for
/// creating conversations and sampling requests.
///
/// Once the provider is created, it should behave like a stateless object.
/// Conversation state belongs to the [`SessionHandle`]s it hands out, and
/// the provider should be prepared for being dropped anytime.
///
/// Providers never retry on their own. Every failure is reported to the
/// caller.
pub trait ModelProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// The streamed response type for this provider.
    type Response: ModelResponse<Error = Self::Error>;

    /// Creates a conversation bound to the given behavioral instructions.
    fn create_session(
        &self,
        instructions: &str,
    ) -> impl Future<Output = Result<SessionHandle, Self::Error>> + Send + 'static;

    /// Sends a request and streams the response.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;

    /// Sends a request and waits for the complete response.
    fn generate(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<GenerateResponse, Self::Error>> + Send + 'static;
}
