use parking_lot::Mutex;

pub(crate) type StateObserver = Box<dyn Fn(RelayState) + Send + Sync>;

/// The stage of a [`ChatRelay`](crate::ChatRelay).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RelayState {
    /// Ready for the next message.
    #[default]
    Idle,
    /// The request is sent, no response has arrived yet.
    Sending,
    /// The response is streaming in.
    Streaming,
    /// The turn has failed. The relay moves on to `Idle` right away.
    Failed,
}

struct Inner {
    state: RelayState,
    // Bumped whenever a turn starts or the relay is reset. Streams of an
    // older epoch are detached and may not touch the state anymore.
    epoch: u64,
}

/// State shared by a relay and the stream of its current turn.
pub(crate) struct Shared {
    inner: Mutex<Inner>,
    on_state_change: Option<StateObserver>,
}

impl Shared {
    pub fn new(on_state_change: Option<StateObserver>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: RelayState::Idle,
                epoch: 0,
            }),
            on_state_change,
        }
    }

    #[inline]
    pub fn state(&self) -> RelayState {
        self.inner.lock().state
    }

    #[inline]
    pub fn is_current(&self, epoch: u64) -> bool {
        self.inner.lock().epoch == epoch
    }

    /// Enters `Sending` for a new turn and returns the turn's epoch.
    pub fn start_turn(&self) -> u64 {
        let epoch = {
            let mut inner = self.inner.lock();
            inner.epoch += 1;
            inner.state = RelayState::Sending;
            inner.epoch
        };
        self.notify(RelayState::Sending);
        epoch
    }

    /// Moves the turn of `epoch` to `state`. Returns `false` if the turn
    /// has been detached.
    pub fn transition(&self, epoch: u64, state: RelayState) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.epoch != epoch {
                return false;
            }
            if inner.state == state {
                return true;
            }
            inner.state = state;
        }
        self.notify(state);
        true
    }

    /// Detaches the current turn and returns to `Idle`.
    pub fn reset(&self) {
        let previous = {
            let mut inner = self.inner.lock();
            inner.epoch += 1;
            std::mem::replace(&mut inner.state, RelayState::Idle)
        };
        if previous != RelayState::Idle {
            self.notify(RelayState::Idle);
        }
    }

    // Observers run outside of the lock, so they may query the relay.
    #[inline]
    fn notify(&self, state: RelayState) {
        trace!("relay state: {state:?}");
        if let Some(on_state_change) = &self.on_state_change {
            on_state_change(state);
        }
    }
}
