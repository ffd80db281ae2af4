//! A local fake model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use fixmyrig_model::{
    ErrorKind, GenerateResponse, ModelFinishReason, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
    SessionHandle,
};
use parking_lot::Mutex;
use tokio::time::{Sleep, sleep};

pub use preset::*;

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
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
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

pub struct TestModelResponse {
    events: Vec<PresetEvent>,
    event_idx: usize,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();

        if let Some(sleep) = &mut this.sleep {
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;

            let event_idx = this.event_idx;
            this.event_idx += 1;
            if event_idx < this.events.len() {
                return match &this.events[event_idx] {
                    PresetEvent::MessageDelta(msg) => Poll::Ready(Ok(Some(
                        ModelResponseEvent::MessageDelta(msg.clone()),
                    ))),
                    PresetEvent::Failure(reason) => {
                        // Nothing is produced after a failure.
                        this.event_idx = usize::MAX;
                        Poll::Ready(Err(Error::new(
                            reason.clone(),
                            ErrorKind::Other,
                        )))
                    }
                };
            } else if event_idx == this.events.len() {
                return Poll::Ready(Ok(Some(ModelResponseEvent::Completed(
                    ModelFinishReason::Stop,
                ))));
            } else {
                // In case this method is called after completion.
                this.event_idx = usize::MAX;
                return Poll::Ready(Ok(None));
            }
        }
        if this.event_idx == usize::MAX {
            return Poll::Ready(Ok(None));
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_event(cx)
    }
}

#[derive(Default)]
struct Script {
    responses: VecDeque<PresetResponse>,
    generations: VecDeque<PresetGenerate>,
    requests: Vec<ModelRequest>,
    sessions: Vec<String>,
    delay: Option<Duration>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// model should respond. Each streamed request consumes the next preset
/// response and each unary request consumes the next preset generation, in
/// the order they were added. If there are no enough presets in the
/// script, an error will be returned.
///
/// Clones share the same script and the same request log, so a clone can
/// be kept to inspect what the code under test has sent.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Mutex<Script>>,
}

impl TestModelProvider {
    #[inline]
    pub fn add_response(&self, preset: PresetResponse) {
        self.script.lock().responses.push_back(preset);
    }

    #[inline]
    pub fn add_generation(&self, preset: PresetGenerate) {
        self.script.lock().generations.push_back(preset);
    }

    #[inline]
    pub fn set_delay(&self, duration: Duration) {
        self.script.lock().delay = Some(duration);
    }

    /// Returns every request received so far, streamed and unary.
    #[inline]
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.script.lock().requests.clone()
    }

    /// Returns the instructions of every session created so far.
    #[inline]
    pub fn sessions(&self) -> Vec<String> {
        self.script.lock().sessions.clone()
    }
}

impl Debug for TestModelProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let script = self.script.lock();
        f.debug_struct("TestModelProvider")
            .field("pending_responses", &script.responses.len())
            .field("pending_generations", &script.generations.len())
            .field("requests", &script.requests.len())
            .finish()
    }
}

/// Pops the front preset, or fails it while it still has failures left.
fn take_preset(
    responses: &mut VecDeque<PresetResponse>,
) -> Result<PresetResponse, Error> {
    let Some(front) = responses.front_mut() else {
        return Err(Error::new("no enough presets", ErrorKind::Other));
    };
    match front.failures {
        Some(0) => {
            return Err(Error::new("preset always fails", ErrorKind::Other));
        }
        Some(n) => {
            front.failures = (n > 1).then(|| n - 1);
            return Err(Error::new("preset failure", ErrorKind::Other));
        }
        None => {}
    }
    responses
        .pop_front()
        .ok_or_else(|| Error::new("no enough presets", ErrorKind::Other))
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn create_session(
        &self,
        instructions: &str,
    ) -> impl Future<Output = Result<SessionHandle, Self::Error>> + Send + 'static
    {
        let mut script = self.script.lock();
        let id = format!("session:{}", script.sessions.len());
        script.sessions.push(instructions.to_owned());
        ready(Ok(SessionHandle::new(id, instructions.to_owned())))
    }

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let mut script = self.script.lock();
        script.requests.push(req.clone());
        let delay = script.delay.unwrap_or(Duration::from_millis(1));
        let result =
            take_preset(&mut script.responses).map(|preset| TestModelResponse {
                events: preset.events,
                event_idx: 0,
                delay,
                sleep: None,
            });
        ready(result)
    }

    fn generate(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<GenerateResponse, Self::Error>> + Send + 'static
    {
        let mut script = self.script.lock();
        script.requests.push(req.clone());
        let result = match script.generations.pop_front() {
            Some(preset) if preset.fail => {
                Err(Error::new("generation failure", ErrorKind::Other))
            }
            Some(preset) => Ok(GenerateResponse {
                text: preset.text,
                citations: preset.citations,
            }),
            None => Err(Error::new("no enough presets", ErrorKind::Other)),
        };
        ready(result)
    }
}
