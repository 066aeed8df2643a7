use archpilot_core::ArchError;

/// Terminal errors surfaced by the gateway client.
///
/// Authorization exhaustion and transient exhaustion are distinct variants so
/// callers can tell a credential problem from a flaky endpoint.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("authorization failed for tool '{tool}': {detail}")]
    Authorization { tool: String, detail: String },

    #[error("transient failure invoking tool '{tool}' after {attempts} attempts: {detail}")]
    Transient { tool: String, attempts: u32, detail: String },

    #[error("tool '{tool}' failed: {detail}")]
    Tool { tool: String, detail: String },

    #[error("malformed response from tool '{tool}': {detail}")]
    Malformed { tool: String, detail: String },

    #[error("credential fetch failed: {0}")]
    Credential(String),
}

impl From<GatewayError> for ArchError {
    fn from(err: GatewayError) -> Self {
        ArchError::Gateway(err.to_string())
    }
}

/// Per-call transport outcome, classified so the client can decide between
/// refresh, retry, and terminal failure.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("transient: {0}")]
    Transient(String),

    #[error("fatal: {0}")]
    Fatal(String),
}
