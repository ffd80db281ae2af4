//! Relays between a consumer and the remote model: the streaming chat
//! relay with its conversation session, and the single-shot image
//! inspection and resource search relays.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

pub mod chat_log;
mod error;
mod inspect;
mod model_client;
pub mod prompts;
mod relay;
mod search;
mod session;

pub use error::{RelayError, TransportError};
pub use inspect::{EMPTY_REPORT, FAILED_REPORT, InspectionRelay};
pub use relay::{ChatRelay, ChatRelayBuilder, ChatStream, RelayState};
pub use search::{
    EMPTY_SUMMARY, FAILED_SUMMARY, LinkPolicy, SearchLink, SearchRelay,
    SearchResult, extract_links,
};
pub use session::SessionState;
