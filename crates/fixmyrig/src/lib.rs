//! An out-of-the-box PC troubleshooting assistant backed by Gemini.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library to bring the assistant into your own host apps.

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

mod assistant;
pub mod media;

pub use assistant::{Assistant, AssistantBuilder};

/// Re-exports of [`fixmyrig_core`] crate.
pub mod core {
    pub use fixmyrig_core::*;
}

/// Re-exports of [`fixmyrig_gemini_model`] crate.
pub mod gemini {
    pub use fixmyrig_gemini_model::*;
}
