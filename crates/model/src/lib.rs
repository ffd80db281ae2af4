//! An abstraction layer for the remote generative model.
//!
//! This crate establishes the protocol between the relays and a model
//! provider: unary generation, streamed generation, and provider-side
//! conversation sessions. Relays only talk to the traits defined here,
//! so the hosted provider can be swapped for a scripted one in tests.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod grounding;
mod handle;
mod provider;
mod request;
mod response;

pub use error::*;
pub use grounding::*;
pub use handle::*;
pub use provider::*;
pub use request::*;
pub use response::*;
