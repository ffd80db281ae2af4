use fixmyrig_model::GroundingChunk;
use serde::{Deserialize, Serialize};

/// The events in a preset streamed response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "message_delta")]
    MessageDelta(String),
    /// The stream breaks with a transport error at this point.
    #[serde(rename = "failure")]
    Failure(String),
}

/// The preset for one streamed response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
    /// If set, the request will fail in the first `failure` attempts.
    /// `Some(0)` means the request will fail infinitely.
    pub failures: Option<u64>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            failures: None,
        }
    }

    /// Creates a `PresetResponse` made of text fragments only.
    #[inline]
    pub fn with_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_events(
            fragments
                .into_iter()
                .map(|f| PresetEvent::MessageDelta(f.into()))
                .collect::<Vec<_>>(),
        )
    }

    /// Sets failure times before a successful response. `0` means the
    /// response will always be a failure.
    #[inline]
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = Some(failures);
        self
    }
}

/// The preset for one unary response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetGenerate {
    /// The generated text.
    pub text: String,
    /// Citation records returned with the text.
    pub citations: Vec<GroundingChunk>,
    /// Whether the call fails instead of answering.
    pub fail: bool,
}

impl PresetGenerate {
    /// Creates a successful response with the given text.
    #[inline]
    pub fn with_text<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            citations: vec![],
            fail: false,
        }
    }

    /// Creates a failing response.
    #[inline]
    pub fn failure() -> Self {
        Self {
            text: String::new(),
            citations: vec![],
            fail: true,
        }
    }

    /// Attaches citation records.
    #[inline]
    pub fn with_citations(
        mut self,
        citations: impl Into<Vec<GroundingChunk>>,
    ) -> Self {
        self.citations = citations.into();
        self
    }
}
