use std::pin::Pin;
use std::task::{Context, Poll, ready};

use fixmyrig_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
};
use pin_project_lite::pin_project;

use crate::Error;
use crate::io::{Sse, SseError};
use crate::proto::GenerateContentResponse;
use crate::session::PendingTurn;

struct PartialState {
    sse: Sse,
    content: String,
    received_any: bool,
    finished: bool,
    // Gemini reports the finish reason on the chunk carrying the last text.
    // The text is emitted first and the reason is kept here until the next
    // poll.
    pending_finish_reason: Option<ModelFinishReason>,
    turn: Option<PendingTurn>,
}

impl PartialState {
    #[inline]
    fn finish(self) {
        if let Some(turn) = self.turn {
            turn.commit(self.content);
        }
    }
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    /// A streamed `streamGenerateContent` response.
    pub struct GeminiResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl GeminiResponse {
    #[inline]
    pub(crate) fn from_sse(sse: Sse, turn: Option<PendingTurn>) -> Self {
        let partial_state = PartialState {
            sse,
            content: Default::default(),
            received_any: false,
            finished: false,
            pending_finish_reason: None,
            turn,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
        }
    }
}

impl ModelResponse for GeminiResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, partial_state)) => {
                    *this.next_event_fut = None;
                    partial_state.finish();
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(
    mut partial_state: PartialState,
) -> Result<(Option<ModelResponseEvent>, PartialState), Error> {
    if let Some(finish_reason) = partial_state.pending_finish_reason.take() {
        return Ok((
            Some(ModelResponseEvent::Completed(finish_reason)),
            partial_state,
        ));
    }

    loop {
        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(SseError::Truncated) => {
                return Err(Error::new(
                    "response stream ended before finishing",
                    ErrorKind::InvalidResponse,
                ));
            }
            Err(err) => {
                return Err(Error::new(
                    format!("response stream interrupted: {err:?}"),
                    ErrorKind::Other,
                ));
            }
        };
        trace!("got sse event: {sse_event}");

        let chunk = serde_json::from_str::<GenerateContentResponse>(&sse_event)
            .map_err(|err| {
                Error::new(
                    format!("malformed chunk: {err}"),
                    ErrorKind::InvalidResponse,
                )
            })?;
        chunk.check()?;
        partial_state.received_any = true;

        let delta = chunk.text().filter(|text| !text.is_empty());
        let finish_reason = chunk.finish_reason();
        if finish_reason.is_some() {
            partial_state.finished = true;
        }

        match (delta, finish_reason) {
            (Some(delta), finish_reason) => {
                partial_state.pending_finish_reason = finish_reason;
                partial_state.content.push_str(&delta);
                return Ok((
                    Some(ModelResponseEvent::MessageDelta(delta)),
                    partial_state,
                ));
            }
            (None, Some(finish_reason)) => {
                return Ok((
                    Some(ModelResponseEvent::Completed(finish_reason)),
                    partial_state,
                ));
            }
            // Metadata-only chunks.
            (None, None) => continue,
        }
    }

    if !partial_state.received_any {
        return Err(Error::new(
            "the response stream ended without any chunk",
            ErrorKind::InvalidResponse,
        ));
    }
    // The provider did not send its end signal, the answer is incomplete.
    if !partial_state.finished {
        return Err(Error::new(
            "response stream ended before finishing",
            ErrorKind::InvalidResponse,
        ));
    }

    Ok((None, partial_state))
}
