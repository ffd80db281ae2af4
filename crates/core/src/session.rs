use std::sync::Arc;

use fixmyrig_model::{ModelProvider, SessionHandle};

use crate::error::TransportError;
use crate::model_client::ModelClient;

/// The conversation a [`ChatRelay`](crate::ChatRelay) talks in.
///
/// Holds at most one provider-side session at a time. The behavioral
/// instructions are fixed when the state is created and every session it
/// creates uses them. History lives on the provider side of the session
/// handle and is never replayed from here.
pub struct SessionState {
    client: ModelClient,
    instructions: Arc<str>,
    current: Option<SessionHandle>,
}

impl SessionState {
    /// Creates a state without a live session.
    #[inline]
    pub fn new<P: ModelProvider + 'static, S: Into<String>>(
        provider: P,
        instructions: S,
    ) -> Self {
        Self::with_client(ModelClient::new(provider), instructions.into())
    }

    #[inline]
    pub(crate) fn with_client(
        client: ModelClient,
        instructions: String,
    ) -> Self {
        Self {
            client,
            instructions: instructions.into(),
            current: None,
        }
    }

    /// Returns the fixed instructions.
    #[inline]
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Returns the live session, if any.
    #[inline]
    pub fn current(&self) -> Option<&SessionHandle> {
        self.current.as_ref()
    }

    /// Returns the live session, creating one first if there is none.
    pub async fn ensure(&mut self) -> Result<SessionHandle, TransportError> {
        if let Some(handle) = &self.current {
            return Ok(handle.clone());
        }
        let handle = self.client.create_session(&self.instructions).await?;
        debug!("started session {}", handle.id());
        self.current = Some(handle.clone());
        Ok(handle)
    }

    /// Discards the live session. The next [`ensure`](Self::ensure) starts
    /// a fresh one.
    #[inline]
    pub fn reset(&mut self) {
        if let Some(handle) = self.current.take() {
            debug!("discarded session {}", handle.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use fixmyrig_test_model::TestModelProvider;

    use super::*;

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let provider = TestModelProvider::default();
        let mut session = SessionState::new(provider.clone(), "rules");
        assert!(session.current().is_none());

        let a = session.ensure().await.unwrap();
        let b = session.ensure().await.unwrap();
        assert_eq!(a, b);
        assert_eq!(session.current(), Some(&a));
        assert_eq!(provider.sessions().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_starts_fresh_session() {
        let provider = TestModelProvider::default();
        let mut session = SessionState::new(provider.clone(), "rules");

        let before = session.ensure().await.unwrap();
        session.reset();
        assert!(session.current().is_none());
        let after = session.ensure().await.unwrap();

        assert_ne!(before, after);
        assert_eq!(session.instructions(), "rules");
        assert_eq!(provider.sessions(), ["rules", "rules"]);
        assert_eq!(after.to_raw::<String>().unwrap(), "rules");
    }
}
