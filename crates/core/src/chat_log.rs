//! The visible transcript of a chat.

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RelayError;
use crate::relay::ChatRelay;

/// The first message of a fresh transcript.
pub const GREETING: &str = "Hello! I'm your FixMyRig assistant. Briefly \
    describe the problem you're having with your PC (e.g., 'Won't turn on', \
    'Blue Screen', 'Overheating'). Remember to always unplug your PC before \
    touching internal components!";

/// The first message after the conversation was reset.
pub const RESET_NOTICE: &str =
    "Diagnostics reset. What issue are you facing now?";

/// The message shown when an answer fails.
pub const CONNECTION_ERROR: &str = "I'm encountering a connection error. \
    Please check your API key or internet connection and try again.";

/// Who wrote a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking for help.
    User,
    /// The assistant.
    Model,
}

/// A message in the transcript.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message id.
    pub id: Uuid,
    /// Who wrote the message.
    pub role: Role,
    /// The message text. A model message grows while its answer streams.
    pub text: String,
    /// When the message was created.
    pub timestamp: DateTime<Utc>,
    /// Whether the message reports a failure.
    pub is_error: bool,
}

impl ChatMessage {
    fn new(role: Role, text: String, is_error: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text,
            timestamp: Utc::now(),
            is_error,
        }
    }

    /// Creates a user message.
    #[inline]
    pub fn user<S: Into<String>>(text: S) -> Self {
        Self::new(Role::User, text.into(), false)
    }

    /// Creates a model message.
    #[inline]
    pub fn model<S: Into<String>>(text: S) -> Self {
        Self::new(Role::Model, text.into(), false)
    }

    /// Creates an error-flagged model message.
    #[inline]
    pub fn error<S: Into<String>>(text: S) -> Self {
        Self::new(Role::Model, text.into(), true)
    }
}

/// An ordered transcript that folds streamed fragments into messages.
///
/// A turn starts with [`begin_turn`](Self::begin_turn), which records the
/// user message and an empty model message. Fragments are appended to that
/// model message until the turn is finished or failed.
#[derive(Debug, Default)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
    open: bool,
}

impl ChatLog {
    /// Creates an empty transcript.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transcript that starts with the greeting.
    #[inline]
    pub fn with_greeting() -> Self {
        Self {
            messages: vec![ChatMessage::model(GREETING)],
            open: false,
        }
    }

    /// Returns the messages, oldest first.
    #[inline]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Returns whether a turn is still streaming.
    #[inline]
    pub fn is_streaming(&self) -> bool {
        self.open
    }

    /// Records the user message and opens an empty model message.
    pub fn begin_turn<S: Into<String>>(&mut self, text: S) {
        self.close();
        self.messages.push(ChatMessage::user(text));
        self.messages.push(ChatMessage::model(String::new()));
        self.open = true;
    }

    /// Appends a fragment to the open model message.
    pub fn push_fragment(&mut self, fragment: &str) {
        if !self.open {
            warn!("dropping a fragment outside of a turn");
            return;
        }
        if let Some(message) = self.messages.last_mut() {
            message.text.push_str(fragment);
        }
    }

    /// Closes the open model message.
    #[inline]
    pub fn finish_turn(&mut self) {
        self.close();
    }

    /// Closes the turn with an error message.
    ///
    /// Text received before the failure is kept. An open model message
    /// that received nothing is replaced by the error message.
    pub fn fail_turn(&mut self) {
        if self.open {
            if self
                .messages
                .last()
                .is_some_and(|message| message.text.is_empty())
            {
                self.messages.pop();
            }
            self.open = false;
        }
        self.messages.push(ChatMessage::error(CONNECTION_ERROR));
    }

    /// Clears the transcript and leaves the reset notice.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.messages.push(ChatMessage::model(RESET_NOTICE));
        self.open = false;
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if self
            .messages
            .last()
            .is_some_and(|message| message.text.is_empty())
        {
            self.messages.pop();
        }
    }

    /// Sends `text` through the relay and records the whole turn.
    ///
    /// Every fragment is passed to `on_fragment` as it arrives. Transport
    /// failures are recorded in the transcript as an error message and are
    /// not returned; the only error returned is [`RelayError::Busy`].
    pub async fn converse(
        &mut self,
        relay: &mut ChatRelay,
        text: &str,
        mut on_fragment: impl FnMut(&str),
    ) -> Result<(), RelayError> {
        let mut stream = match relay.send(text).await {
            Ok(Some(stream)) => stream,
            Ok(None) => return Ok(()),
            Err(RelayError::Busy) => return Err(RelayError::Busy),
            Err(err) => {
                self.messages.push(ChatMessage::user(text));
                debug!("chat turn failed before streaming: {err}");
                self.fail_turn();
                return Ok(());
            }
        };

        self.begin_turn(text);
        while let Some(item) = stream.next().await {
            match item {
                Ok(fragment) => {
                    self.push_fragment(&fragment);
                    on_fragment(&fragment);
                }
                Err(err) => {
                    debug!("chat turn failed: {err}");
                    self.fail_turn();
                    return Ok(());
                }
            }
        }
        self.finish_turn();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use fixmyrig_test_model::{
        PresetEvent, PresetResponse, TestModelProvider,
    };

    use super::*;
    use crate::relay::ChatRelayBuilder;

    fn texts(log: &ChatLog) -> Vec<(Role, &str, bool)> {
        log.messages()
            .iter()
            .map(|m| (m.role, m.text.as_str(), m.is_error))
            .collect()
    }

    #[test]
    fn test_fold_fragments() {
        let mut log = ChatLog::with_greeting();
        log.begin_turn("Blue screen");
        assert!(log.is_streaming());
        log.push_fragment("Which ");
        log.push_fragment("stop code?");
        log.finish_turn();
        log.push_fragment("late");

        assert_eq!(
            texts(&log),
            [
                (Role::Model, GREETING, false),
                (Role::User, "Blue screen", false),
                (Role::Model, "Which stop code?", false),
            ]
        );
        assert!(!log.is_streaming());

        let ids: Vec<_> = log.messages().iter().map(|m| m.id).collect();
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
    }

    #[test]
    fn test_fail_turn() {
        let mut log = ChatLog::new();
        log.begin_turn("Fan noise");
        log.push_fragment("Check the ");
        log.fail_turn();
        assert_eq!(
            texts(&log),
            [
                (Role::User, "Fan noise", false),
                (Role::Model, "Check the ", false),
                (Role::Model, CONNECTION_ERROR, true),
            ]
        );

        let mut log = ChatLog::new();
        log.begin_turn("Fan noise");
        log.fail_turn();
        assert_eq!(
            texts(&log),
            [
                (Role::User, "Fan noise", false),
                (Role::Model, CONNECTION_ERROR, true),
            ]
        );
    }

    #[test]
    fn test_reset() {
        let mut log = ChatLog::with_greeting();
        log.begin_turn("No display");
        log.push_fragment("Is the monitor on?");
        log.reset();
        assert_eq!(texts(&log), [(Role::Model, RESET_NOTICE, false)]);
    }

    #[test]
    fn test_role_serialization() {
        let message = ChatMessage::user("hi");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["is_error"], false);
    }

    #[tokio::test]
    async fn test_converse() {
        let provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_fragments([
            "Reseat ", "the GPU.",
        ]));
        provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Update the ".to_owned()),
            PresetEvent::Failure("connection reset".to_owned()),
        ]));
        let mut relay =
            ChatRelayBuilder::with_model_provider(provider.clone()).build();
        let mut log = ChatLog::with_greeting();

        let mut seen = String::new();
        log.converse(&mut relay, "Artifacts on screen", |f| {
            seen.push_str(f)
        })
        .await
        .unwrap();
        assert_eq!(seen, "Reseat the GPU.");

        log.converse(&mut relay, "   ", |_| {}).await.unwrap();
        log.converse(&mut relay, "Still broken", |_| {}).await.unwrap();

        assert_eq!(
            texts(&log),
            [
                (Role::Model, GREETING, false),
                (Role::User, "Artifacts on screen", false),
                (Role::Model, "Reseat the GPU.", false),
                (Role::User, "Still broken", false),
                (Role::Model, "Update the ", false),
                (Role::Model, CONNECTION_ERROR, true),
            ]
        );
        assert_eq!(provider.requests().len(), 2);
    }
}
