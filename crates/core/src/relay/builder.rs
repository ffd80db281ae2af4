use std::sync::Arc;

use fixmyrig_model::ModelProvider;

use super::state::{Shared, StateObserver};
use super::{ChatRelay, RelayState};
use crate::model_client::ModelClient;
use crate::prompts::TROUBLESHOOTER_INSTRUCTIONS;
use crate::session::SessionState;

/// [`ChatRelay`] builder.
pub struct ChatRelayBuilder {
    client: ModelClient,
    instructions: String,
    model: Option<String>,
    on_state_change: Option<StateObserver>,
}

impl ChatRelayBuilder {
    /// Creates a new builder with the specified model provider.
    ///
    /// The conversation uses the troubleshooting instructions unless
    /// others are set.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            client: ModelClient::new(provider),
            instructions: TROUBLESHOOTER_INSTRUCTIONS.to_owned(),
            model: None,
            on_state_change: None,
        }
    }

    /// Sets the behavioral instructions of the conversation.
    #[inline]
    pub fn with_instructions<S: Into<String>>(
        mut self,
        instructions: S,
    ) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Selects the model. The provider's default is used otherwise.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Attaches a callback to be invoked on every state transition.
    #[inline]
    pub fn on_state_change(
        mut self,
        on_state_change: impl Fn(RelayState) + Send + Sync + 'static,
    ) -> Self {
        self.on_state_change = Some(Box::new(on_state_change));
        self
    }

    /// Builds the relay.
    #[inline]
    pub fn build(self) -> ChatRelay {
        let Self {
            client,
            instructions,
            model,
            on_state_change,
        } = self;

        ChatRelay {
            session: SessionState::with_client(client.clone(), instructions),
            client,
            model,
            shared: Arc::new(Shared::new(on_state_change)),
        }
    }
}
