use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use fixmyrig_model::{
    GenerateResponse, ModelFinishReason, ModelProvider, ModelRequest,
    ModelResponse, ModelResponseEvent, SessionHandle,
};
use futures_util::Stream;
use pin_project_lite::pin_project;
use tracing::Instrument;

use crate::error::TransportError;

pub(crate) type BoxedFuture<T> =
    Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send>>;

/// Text fragments of a streamed response, in the order the provider
/// produced them. An `Err` item is terminal.
pub(crate) type FragmentStream =
    Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// A wrapper around a model provider that provides a type-erased
/// interface for the other modules.
#[derive(Clone)]
pub(crate) struct ModelClient {
    provider: Arc<dyn ProviderObject>,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since the relays don't have a
        // generic parameter and we don't want them either.
        Self {
            provider: Arc::new(AnyProvider(provider)),
        }
    }

    #[inline]
    pub fn create_session(
        &self,
        instructions: &str,
    ) -> BoxedFuture<SessionHandle> {
        self.provider.create_session(instructions)
    }

    /// Sends a request and returns its fragments once the response stream
    /// has opened.
    ///
    /// # Cancel safety
    ///
    /// Dropping the future or the returned stream drops the underlying
    /// response, and no further fragments are pulled from the provider.
    #[inline]
    pub fn stream(&self, req: ModelRequest) -> BoxedFuture<FragmentStream> {
        self.provider.stream(req)
    }

    #[inline]
    pub fn generate(&self, req: ModelRequest) -> BoxedFuture<GenerateResponse> {
        self.provider.generate(req)
    }
}

trait ProviderObject: Send + Sync + 'static {
    fn create_session(&self, instructions: &str) -> BoxedFuture<SessionHandle>;

    fn stream(&self, req: ModelRequest) -> BoxedFuture<FragmentStream>;

    fn generate(&self, req: ModelRequest) -> BoxedFuture<GenerateResponse>;
}

struct AnyProvider<P: ModelProvider>(P);

impl<P: ModelProvider + 'static> ProviderObject for AnyProvider<P> {
    fn create_session(&self, instructions: &str) -> BoxedFuture<SessionHandle> {
        let fut = self.0.create_session(instructions);
        Box::pin(async move {
            fut.await.map_err(|err| {
                error!("failed to create a session: {err}");
                TransportError::new(err)
            })
        })
    }

    fn stream(&self, req: ModelRequest) -> BoxedFuture<FragmentStream> {
        let fut = self.0.send_request(&req);
        Box::pin(
            async move {
                trace!("streaming a request: {:?}", req.text);
                let resp = fut.await.map_err(|err| {
                    error!("got an error: {err}");
                    TransportError::new(err)
                })?;
                trace!("start receiving events");
                let fragments: FragmentStream = Box::pin(Fragments {
                    response: resp,
                    done: false,
                });
                Ok(fragments)
            }
            .instrument(trace_span!("model client stream")),
        )
    }

    fn generate(&self, req: ModelRequest) -> BoxedFuture<GenerateResponse> {
        let fut = self.0.generate(&req);
        Box::pin(
            async move {
                trace!("generating for a request: {:?}", req.text);
                let resp = fut.await.map_err(|err| {
                    error!("got an error: {err}");
                    TransportError::new(err)
                })?;
                trace!("finished a request");
                Ok(resp)
            }
            .instrument(trace_span!("model client generate")),
        )
    }
}

pin_project! {
    struct Fragments<R> {
        #[pin]
        response: R,
        done: bool,
    }
}

impl<R: ModelResponse> Stream for Fragments<R> {
    type Item = Result<String, TransportError>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if *this.done {
                return Poll::Ready(None);
            }
            match ready!(this.response.as_mut().poll_next_event(cx)) {
                Ok(Some(ModelResponseEvent::MessageDelta(delta))) => {
                    return Poll::Ready(Some(Ok(delta)));
                }
                Ok(Some(ModelResponseEvent::Completed(reason))) => {
                    if reason == ModelFinishReason::Stop {
                        trace!("response completed");
                    } else {
                        warn!("response stopped early: {reason:?}");
                    }
                }
                Ok(None) => {
                    *this.done = true;
                    trace!("finished a request");
                    return Poll::Ready(None);
                }
                Err(err) => {
                    *this.done = true;
                    error!("response stream failed: {err}");
                    return Poll::Ready(Some(Err(TransportError::new(err))));
                }
            }
        }
    }
}
