//! A model provider for the Google Gemini REST API.

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;
mod session;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::future::ready;
use std::sync::Arc;

use fixmyrig_model::{
    ErrorKind, GenerateResponse, ModelProvider, ModelProviderError,
    ModelRequest, SessionHandle,
};
use mime::Mime;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use tracing::Instrument;
use uuid::Uuid;

pub use config::{
    CREDENTIAL_VARS, ConfigError, Credential, GeminiConfig,
    GeminiConfigBuilder,
};
use io::{Chunks, Sse};
use proto::{ErrorEnvelope, GenerateContentRequest, GenerateContentResponse};
pub use response::GeminiResponse;
use session::{Conversation, PendingTurn};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Error type for [`GeminiProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Gemini model provider.
///
/// Conversations created by [`ModelProvider::create_session`] keep their
/// history inside the returned [`SessionHandle`]. Each request sent within
/// a session carries that history, and the exchange is appended to it
/// once the model has answered successfully.
#[derive(Clone, Debug)]
pub struct GeminiProvider {
    client: Client,
    config: Arc<GeminiConfig>,
}

impl GeminiProvider {
    /// Creates a new `GeminiProvider` with the given configuration.
    #[inline]
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    /// Creates a provider configured from the environment.
    ///
    /// Fails without touching the network when no API key is set.
    #[inline]
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(GeminiConfigBuilder::from_env()?.build()))
    }

    fn post(&self, req: &ModelRequest, method: &str) -> RequestBuilder {
        let model = req.model.as_deref().unwrap_or(&self.config.model);
        self.client
            .post(format!(
                "{}/models/{model}:{method}",
                self.config.base_url
            ))
            .header(API_KEY_HEADER, self.config.credential.expose())
            .header(header::CONTENT_TYPE, "application/json")
    }

    /// Builds the payload, taking the history of the request's session
    /// into account.
    fn prepare(
        &self,
        req: &ModelRequest,
    ) -> (GenerateContentRequest, Option<PendingTurn>) {
        let conversation = req.session.as_ref().and_then(|session| {
            let conversation = session.to_raw::<Conversation>();
            if conversation.is_none() {
                warn!(
                    "session {} was not created by this provider, \
                     sending without history",
                    session.id()
                );
            }
            conversation.map(|c| (session, c))
        });

        match conversation {
            Some((session, conversation)) => {
                let body = proto::create_request(
                    req,
                    conversation.snapshot(),
                    Some(conversation.instructions()),
                );
                let turn = PendingTurn::new(
                    session.clone(),
                    proto::create_user_content(req),
                );
                (body, Some(turn))
            }
            None => (proto::create_request(req, vec![], None), None),
        }
    }
}

impl ModelProvider for GeminiProvider {
    type Error = Error;
    type Response = GeminiResponse;

    fn create_session(
        &self,
        instructions: &str,
    ) -> impl Future<Output = Result<SessionHandle, Self::Error>> + Send + 'static
    {
        let id = format!("session:{}", Uuid::new_v4());
        debug!("created conversation {id}");
        ready(Ok(SessionHandle::new(id, Conversation::new(instructions))))
    }

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let (body, turn) = self.prepare(req);
        let resp_fut = self
            .post(req, "streamGenerateContent?alt=sse")
            .header(header::ACCEPT, "text/event-stream")
            .json(&body)
            .send();

        async move {
            let resp = check_status(resp_fut.await).await?;

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let is_event_stream = content_type
                .and_then(|v| v.parse().ok())
                .map(|m: Mime| m.subtype().as_str() == "event-stream")
                .unwrap_or(false);
            if !is_event_stream {
                return Err(Error::new(
                    format!("unexpected content type: {content_type:?}"),
                    ErrorKind::InvalidResponse,
                ));
            }

            // Here we got a successful response.
            let sse = Sse::new(Chunks::from_response(resp));
            Ok(GeminiResponse::from_sse(sse, turn))
        }
        .instrument(debug_span!("gemini stream"))
    }

    fn generate(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<GenerateResponse, Self::Error>> + Send + 'static
    {
        let (body, turn) = self.prepare(req);
        let resp_fut = self.post(req, "generateContent").json(&body).send();

        async move {
            let resp = check_status(resp_fut.await).await?;
            let payload: GenerateContentResponse =
                resp.json().await.map_err(|err| {
                    Error::new(
                        format!("malformed response: {err}"),
                        ErrorKind::InvalidResponse,
                    )
                })?;
            payload.check()?;
            if payload.candidates.is_empty() {
                return Err(Error::new(
                    "the response has no candidates",
                    ErrorKind::InvalidResponse,
                ));
            }
            trace!("finish reason: {:?}", payload.finish_reason());

            let text = payload.text().unwrap_or_default();
            if let Some(turn) = turn {
                turn.commit(text.clone());
            }
            Ok(GenerateResponse {
                text,
                citations: payload.into_citations(),
            })
        }
        .instrument(debug_span!("gemini generate"))
    }
}

async fn check_status(
    resp_or_err: Result<Response, reqwest::Error>,
) -> Result<Response, Error> {
    let resp = resp_or_err.map_err(|err| {
        Error::new(format!("request failed: {err}"), ErrorKind::Other)
    })?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .unwrap_or(body);
    error!("provider answered {status}: {message}");
    Err(Error::new(message, kind_for_status(status)))
}

#[inline]
fn kind_for_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ErrorKind::Unauthorized
        }
        StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimitExceeded,
        _ => ErrorKind::Other,
    }
}
