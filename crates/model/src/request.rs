use bytes::Bytes;
use mime::Mime;

use crate::SessionHandle;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// The model identifier, or `None` for the provider's default model.
    pub model: Option<String>,
    /// The conversation this request belongs to.
    ///
    /// When set, the provider appends the exchange to the session's
    /// history. Callers never resend earlier turns themselves.
    pub session: Option<SessionHandle>,
    /// The prompt text.
    pub text: String,
    /// An optional binary attachment sent along with the prompt.
    pub attachment: Option<ImageAttachment>,
    /// Tools that the model is allowed to use.
    pub tools: Vec<ModelTool>,
}

impl ModelRequest {
    /// Creates a stateless request with the given prompt text.
    #[inline]
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self {
            model: None,
            session: None,
            text: text.into(),
            attachment: None,
            tools: vec![],
        }
    }

    /// Selects the model to use.
    #[inline]
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Sends the request within a conversation.
    #[inline]
    pub fn with_session(mut self, session: SessionHandle) -> Self {
        self.session = Some(session);
        self
    }

    /// Attaches an image to the request.
    #[inline]
    pub fn with_attachment(mut self, attachment: ImageAttachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Enables a tool.
    #[inline]
    pub fn with_tool(mut self, tool: ModelTool) -> Self {
        self.tools.push(tool);
        self
    }
}

/// Raw image bytes with a declared media type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageAttachment {
    /// The media type, e.g. `image/jpeg`.
    pub media_type: Mime,
    /// The undecoded image bytes.
    pub data: Bytes,
}

impl ImageAttachment {
    /// Creates an attachment.
    #[inline]
    pub fn new(data: impl Into<Bytes>, media_type: Mime) -> Self {
        Self {
            media_type,
            data: data.into(),
        }
    }
}

/// Provider-side tools the model may use while answering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelTool {
    /// Ground the answer with a web search. Citations are returned in
    /// [`GenerateResponse::citations`](crate::GenerateResponse).
    WebSearch,
}
