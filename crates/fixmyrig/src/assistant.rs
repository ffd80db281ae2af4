use bytes::Bytes;
use fixmyrig_core::chat_log::{ChatLog, ChatMessage};
use fixmyrig_core::{
    ChatRelay, ChatRelayBuilder, InspectionRelay, LinkPolicy, RelayError,
    RelayState, SearchRelay, SearchResult,
};
use fixmyrig_gemini_model::{ConfigError, GeminiProvider};
use fixmyrig_model::ModelProvider;
use mime::Mime;

/// An assistant builder.
///
/// See [`Assistant`].
pub struct AssistantBuilder {
    chat: ChatRelayBuilder,
    inspection: InspectionRelay,
    search: SearchRelay,
}

impl AssistantBuilder {
    /// Creates an assistant builder with a specified model provider.
    ///
    /// The chat, the image inspection and the resource search share the
    /// provider.
    pub fn with_model_provider<M: ModelProvider + Clone + 'static>(
        provider: M,
    ) -> Self {
        Self {
            chat: ChatRelayBuilder::with_model_provider(provider.clone()),
            inspection: InspectionRelay::with_model_provider(provider.clone()),
            search: SearchRelay::with_model_provider(provider),
        }
    }

    /// Creates an assistant builder talking to Gemini, configured from the
    /// environment.
    #[inline]
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::with_model_provider(GeminiProvider::from_env()?))
    }

    /// Sets the behavioral instructions of the chat.
    #[inline]
    pub fn with_instructions<S: Into<String>>(
        mut self,
        instructions: S,
    ) -> Self {
        self.chat = self.chat.with_instructions(instructions);
        self
    }

    /// Selects the model for every feature.
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        let model = model.into();
        self.chat = self.chat.with_model(model.clone());
        self.inspection = self.inspection.with_model(model.clone());
        self.search = self.search.with_model(model);
        self
    }

    /// Sets how repeated search citations are handled.
    #[inline]
    pub fn with_link_policy(mut self, policy: LinkPolicy) -> Self {
        self.search = self.search.with_link_policy(policy);
        self
    }

    /// Attaches a callback to be invoked when the chat changes its state.
    #[inline]
    pub fn on_state_change(
        mut self,
        on_state_change: impl Fn(RelayState) + Send + Sync + 'static,
    ) -> Self {
        self.chat = self.chat.on_state_change(on_state_change);
        self
    }

    /// Builds a new assistant.
    pub fn build(self) -> Assistant {
        Assistant {
            chat: self.chat.build(),
            log: ChatLog::with_greeting(),
            inspection: self.inspection,
            search: self.search,
        }
    }
}

/// A troubleshooting assistant, like a window with a chat, a photo upload
/// and a search box.
///
/// The assistant keeps the chat transcript. Image inspections and searches
/// are independent of the chat and of each other.
pub struct Assistant {
    chat: ChatRelay,
    log: ChatLog,
    inspection: InspectionRelay,
    search: SearchRelay,
}

impl Assistant {
    /// Sends a chat message and waits for the whole answer.
    ///
    /// Fragments are passed to `on_fragment` while the answer streams in.
    /// A failed answer shows up as an error message in the transcript.
    #[inline]
    pub async fn send_message(
        &mut self,
        message: &str,
        on_fragment: impl FnMut(&str),
    ) -> Result<(), RelayError> {
        self.log.converse(&mut self.chat, message, on_fragment).await
    }

    /// Returns the chat transcript.
    #[inline]
    pub fn messages(&self) -> &[ChatMessage] {
        self.log.messages()
    }

    /// Returns the state of the chat.
    #[inline]
    pub fn state(&self) -> RelayState {
        self.chat.state()
    }

    /// Starts the chat over.
    pub fn reset(&mut self) {
        self.chat.reset();
        self.log.reset();
    }

    /// Inspects a photo of a PC component and returns a report for display.
    #[inline]
    pub async fn inspect(
        &self,
        image: impl Into<Bytes>,
        media_type: Mime,
    ) -> String {
        self.inspection.report(image, media_type).await
    }

    /// Searches for drivers, manuals and forum solutions. Returns `None`
    /// for a blank query.
    #[inline]
    pub async fn search(&self, query: &str) -> Option<SearchResult> {
        self.search.lookup(query).await
    }
}

#[cfg(test)]
mod tests {
    use fixmyrig_core::chat_log::{GREETING, RESET_NOTICE, Role};
    use fixmyrig_core::{FAILED_REPORT, SearchLink};
    use fixmyrig_model::GroundingChunk;
    use fixmyrig_test_model::{
        PresetGenerate, PresetResponse, TestModelProvider,
    };

    use super::*;

    #[tokio::test]
    async fn test_chat_and_reset() {
        let provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_fragments([
            "Does ", "the fan spin?",
        ]));
        let mut assistant =
            AssistantBuilder::with_model_provider(provider.clone())
                .with_model("gemini-test")
                .build();
        assert_eq!(assistant.messages()[0].text, GREETING);

        let mut answer = String::new();
        assistant
            .send_message("PC won't boot", |f| answer.push_str(f))
            .await
            .unwrap();
        assert_eq!(answer, "Does the fan spin?");
        assert_eq!(assistant.messages().len(), 3);
        assert_eq!(assistant.messages()[2].role, Role::Model);
        assert_eq!(assistant.state(), RelayState::Idle);

        assistant.reset();
        assert_eq!(assistant.messages().len(), 1);
        assert_eq!(assistant.messages()[0].text, RESET_NOTICE);
        assert_eq!(
            provider.requests()[0].model.as_deref(),
            Some("gemini-test")
        );
    }

    #[tokio::test]
    async fn test_inspect_and_search() {
        let provider = TestModelProvider::default();
        provider.add_generation(PresetGenerate::failure());
        provider.add_generation(
            PresetGenerate::with_text("Drivers are on the vendor site.")
                .with_citations([
                    GroundingChunk::web("http://a", "A"),
                    GroundingChunk::web("http://a", "A"),
                ]),
        );
        let assistant = AssistantBuilder::with_model_provider(provider)
            .with_link_policy(LinkPolicy::DedupByUrl)
            .build();

        assert_eq!(
            assistant.inspect(vec![1u8, 2, 3], mime::IMAGE_PNG).await,
            FAILED_REPORT
        );
        let result = assistant.search("Realtek audio driver").await.unwrap();
        assert_eq!(result.summary, "Drivers are on the vendor site.");
        assert_eq!(
            result.links,
            [SearchLink {
                title: "A".to_owned(),
                url: "http://a".to_owned(),
            }]
        );
        assert!(assistant.search(" ").await.is_none());
    }
}
