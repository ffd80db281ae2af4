mod builder;
mod state;
mod stream;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use fixmyrig_model::ModelRequest;

use crate::error::RelayError;
use crate::model_client::ModelClient;
use crate::session::SessionState;
pub use builder::ChatRelayBuilder;
pub use state::RelayState;
use state::Shared;
pub use stream::ChatStream;

/// Relays a multi-turn conversation with the model.
///
/// The relay answers one message at a time. [`send`](Self::send) hands out
/// a [`ChatStream`] that yields the answer fragment by fragment, and the
/// relay stays busy until that stream has ended, failed, been dropped, or
/// been detached by [`reset`](Self::reset).
pub struct ChatRelay {
    session: SessionState,
    client: ModelClient,
    model: Option<String>,
    shared: Arc<Shared>,
}

impl ChatRelay {
    /// Sends a user message and returns the stream of the answer.
    ///
    /// Blank messages are ignored: `Ok(None)` is returned and nothing is
    /// sent. While a previous answer is still streaming, the message is
    /// rejected with [`RelayError::Busy`].
    pub async fn send(
        &mut self,
        text: &str,
    ) -> Result<Option<ChatStream>, RelayError> {
        if text.trim().is_empty() {
            trace!("ignoring a blank message");
            return Ok(None);
        }
        let current_state = self.shared.state();
        if current_state != RelayState::Idle {
            warn!("rejecting a message while {current_state:?}");
            return Err(RelayError::Busy);
        }

        let session = self.session.ensure().await?;
        let epoch = self.shared.start_turn();
        let request = ModelRequest::new(text)
            .with_model(self.model.clone())
            .with_session(session);
        let response = self.client.stream(request);
        Ok(Some(ChatStream::new(Arc::clone(&self.shared), epoch, response)))
    }

    /// Starts over with a fresh session.
    ///
    /// Any in-flight answer is detached: its stream ends on the next poll
    /// without yielding further fragments.
    pub fn reset(&mut self) {
        self.session.reset();
        self.shared.reset();
        info!("conversation reset");
    }

    /// Returns the current state.
    #[inline]
    pub fn state(&self) -> RelayState {
        self.shared.state()
    }

    /// Returns the conversation session.
    #[inline]
    pub fn session(&self) -> &SessionState {
        &self.session
    }
}
