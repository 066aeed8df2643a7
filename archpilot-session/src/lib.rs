//! # archpilot-session
//!
//! Durable, TTL-scoped session state for the archpilot pipeline.
//!
//! A [`Session`] owns the conversation log and the versioned artifact history
//! for one user interaction. The [`SessionStore`] trait is the durable
//! key/value boundary; [`InMemorySessionStore`] is the bundled implementation
//! with TTL expiry and compare-and-swap version enforcement.

pub mod inmemory;
pub mod session;
pub mod store;

pub use inmemory::InMemorySessionStore;
pub use session::{STATE_REQUIREMENTS, STATE_REQUIREMENTS_PROFILE, Session, Turn};
pub use store::SessionStore;
