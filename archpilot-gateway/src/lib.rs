//! # archpilot-gateway
//!
//! Authenticated RPC client for externally-hosted tools.
//!
//! The [`GatewayClient`] tracks a bearer credential through the
//! `Unauthenticated -> Authenticated -> Expired -> Authenticated` lifecycle,
//! performs exactly one refresh-and-retry on an authorization failure, and
//! retries transient transport failures with bounded exponential backoff.
//! Both terminal outcomes stay distinguishable through [`GatewayError`].
//!
//! The HTTP transport and the OAuth2 client-credentials provider are gated
//! behind the default `http-transport` feature; tests run against scripted
//! in-process transports.

pub mod auth;
pub mod client;
pub mod error;
pub mod transport;

pub use auth::{AuthState, CachedToken, CredentialProvider, StaticTokenProvider};
pub use client::{GatewayClient, TOOL_REQUIREMENTS_EXTRACTOR, parse_tool_payload};
pub use error::{GatewayError, TransportError};
pub use transport::GatewayTransport;

#[cfg(feature = "http-transport")]
pub use auth::ClientCredentialsProvider;
#[cfg(feature = "http-transport")]
pub use transport::HttpTransport;
