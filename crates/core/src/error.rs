use std::error::Error as StdError;
use std::fmt::{self, Debug, Display};

use fixmyrig_model::{ErrorKind, ModelProviderError};

/// A failure reported by the model provider: network errors, error
/// statuses, malformed payloads and broken response streams.
pub struct TransportError(Box<dyn ModelProviderError>);

impl TransportError {
    #[inline]
    pub(crate) fn new<E: ModelProviderError>(err: E) -> Self {
        Self(Box::new(err))
    }

    /// Returns the kind of the underlying provider error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.0.kind()
    }
}

impl Debug for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

/// Errors returned by the relays.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A message was sent while the previous one is still being answered.
    #[error("the previous message is still being answered")]
    Busy,
    /// The model provider failed.
    #[error("model provider failed: {0}")]
    Transport(#[from] TransportError),
}

impl RelayError {
    /// Returns the provider error kind for transport failures.
    #[inline]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            RelayError::Busy => None,
            RelayError::Transport(err) => Some(err.kind()),
        }
    }
}
