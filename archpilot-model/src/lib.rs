//! Inference backends for archpilot.
//!
//! [`HostedInference`] talks to any OpenAI-compatible chat-completion
//! endpoint; [`ScriptedInference`] replays canned replies for tests.

#[cfg(feature = "http")]
mod http;
mod mock;

#[cfg(feature = "http")]
pub use http::{HostedInference, HostedInferenceConfig};
pub use mock::ScriptedInference;
