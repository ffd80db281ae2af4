use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use futures_util::Stream;

use super::RelayState;
use super::state::Shared;
use crate::error::{RelayError, TransportError};
use crate::model_client::{BoxedFuture, FragmentStream};

enum Stage {
    Connecting(BoxedFuture<FragmentStream>),
    Streaming(FragmentStream),
    Done,
}

/// The answer to one message, yielded fragment by fragment.
///
/// Items are the text fragments in the order the model produced them. A
/// failure yields exactly one `Err` item, after which the stream ends.
/// Fragments yielded before the failure stay valid. The stream also ends
/// without an error when the relay is reset in the meantime.
///
/// Dropping the stream before its end abandons the turn and frees the
/// relay for the next message.
pub struct ChatStream {
    shared: Arc<Shared>,
    epoch: u64,
    stage: Stage,
}

impl ChatStream {
    #[inline]
    pub(super) fn new(
        shared: Arc<Shared>,
        epoch: u64,
        response: BoxedFuture<FragmentStream>,
    ) -> Self {
        Self {
            shared,
            epoch,
            stage: Stage::Connecting(response),
        }
    }

    fn fail(&mut self, err: TransportError) -> RelayError {
        error!("chat turn failed: {err}");
        self.stage = Stage::Done;
        self.shared.transition(self.epoch, RelayState::Failed);
        self.shared.transition(self.epoch, RelayState::Idle);
        RelayError::Transport(err)
    }
}

impl Stream for ChatStream {
    type Item = Result<String, RelayError>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if matches!(this.stage, Stage::Done) {
                return Poll::Ready(None);
            }
            if !this.shared.is_current(this.epoch) {
                debug!("the turn was detached, dropping its response");
                this.stage = Stage::Done;
                return Poll::Ready(None);
            }

            match &mut this.stage {
                Stage::Connecting(response) => {
                    match ready!(response.as_mut().poll(cx)) {
                        Ok(fragments) => {
                            this.shared
                                .transition(this.epoch, RelayState::Streaming);
                            this.stage = Stage::Streaming(fragments);
                        }
                        Err(err) => {
                            return Poll::Ready(Some(Err(this.fail(err))));
                        }
                    }
                }
                Stage::Streaming(fragments) => {
                    match ready!(fragments.as_mut().poll_next(cx)) {
                        Some(Ok(fragment)) if fragment.is_empty() => {}
                        Some(Ok(fragment)) => {
                            return Poll::Ready(Some(Ok(fragment)));
                        }
                        Some(Err(err)) => {
                            return Poll::Ready(Some(Err(this.fail(err))));
                        }
                        None => {
                            this.stage = Stage::Done;
                            this.shared
                                .transition(this.epoch, RelayState::Idle);
                            return Poll::Ready(None);
                        }
                    }
                }
                Stage::Done => return Poll::Ready(None),
            }
        }
    }
}

impl Drop for ChatStream {
    fn drop(&mut self) {
        if !matches!(self.stage, Stage::Done)
            && self.shared.transition(self.epoch, RelayState::Idle)
        {
            debug!("the chat stream was dropped before its end");
        }
    }
}
