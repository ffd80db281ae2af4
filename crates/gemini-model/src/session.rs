use fixmyrig_model::SessionHandle;
use parking_lot::Mutex;

use crate::proto::Content;

/// Conversation memory attached to the session handles this provider
/// creates. The REST API is stateless, so the turns are kept here and
/// sent along with every request of the session.
#[derive(Debug)]
pub struct Conversation {
    instructions: String,
    history: Mutex<Vec<Content>>,
}

impl Conversation {
    #[inline]
    pub fn new(instructions: &str) -> Self {
        Self {
            instructions: instructions.to_owned(),
            history: Mutex::new(vec![]),
        }
    }

    #[inline]
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    #[inline]
    pub fn snapshot(&self) -> Vec<Content> {
        self.history.lock().clone()
    }
}

/// A user turn that is recorded once the model has answered it.
///
/// Failed exchanges are never recorded, so a retry of the same message
/// does not see a dangling user turn.
#[derive(Debug)]
pub struct PendingTurn {
    session: SessionHandle,
    user: Content,
}

impl PendingTurn {
    #[inline]
    pub fn new(session: SessionHandle, user: Content) -> Self {
        Self { session, user }
    }

    pub fn commit(self, reply: String) {
        let Some(conversation) = self.session.to_raw::<Conversation>() else {
            return;
        };
        let mut history = conversation.history.lock();
        history.push(self.user);
        history.push(Content::model_text(reply));
        trace!(
            "session {} now holds {} turns",
            self.session.id(),
            history.len()
        );
    }
}
