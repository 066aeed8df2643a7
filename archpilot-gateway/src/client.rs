use crate::auth::{AuthState, CachedToken, CredentialProvider};
use crate::error::{GatewayError, TransportError};
use crate::transport::GatewayTransport;
use archpilot_core::RetryConfig;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Tool name for requirement extraction from raw document text.
pub const TOOL_REQUIREMENTS_EXTRACTOR: &str = "requirements_extractor";

/// Authenticated client for the remote tool gateway.
///
/// Credential lifecycle: `Unauthenticated -> Authenticated -> Expired ->
/// Authenticated` (after refresh). An authorization failure triggers exactly
/// one refresh and one retry of the same call; a second failure is terminal.
/// Transient transport failures are retried with bounded exponential backoff
/// and surface as [`GatewayError::Transient`] once the cap is exceeded.
pub struct GatewayClient {
    transport: Arc<dyn GatewayTransport>,
    credentials: Arc<dyn CredentialProvider>,
    state: RwLock<AuthState>,
    retry: RetryConfig,
    call_timeout: Duration,
}

impl GatewayClient {
    pub fn new(
        transport: Arc<dyn GatewayTransport>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            transport,
            credentials,
            state: RwLock::new(AuthState::Unauthenticated),
            retry: RetryConfig::default(),
            call_timeout: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub async fn auth_state(&self) -> AuthState {
        self.state.read().await.clone()
    }

    /// Invokes a named gateway tool and returns its decoded payload.
    pub async fn invoke(&self, tool_name: &str, args: Value) -> Result<Value, GatewayError> {
        let token = self.ensure_token().await?;
        let invocation_id = format!("inv_{}", Uuid::new_v4().simple());
        tracing::info!(tool = tool_name, invocation_id = %invocation_id, "invoking gateway tool");

        match self.call_with_retry(tool_name, &invocation_id, &args, &token).await {
            Ok(value) => parse_tool_payload(tool_name, value),
            Err(TransportError::Unauthorized(detail)) => {
                tracing::warn!(tool = tool_name, detail = %detail, "authorization failure; refreshing credential");
                let token = self.refresh_token().await?;

                // Exactly one retry with the refreshed credential.
                match self.call_with_retry(tool_name, &invocation_id, &args, &token).await {
                    Ok(value) => parse_tool_payload(tool_name, value),
                    Err(TransportError::Unauthorized(detail)) => {
                        *self.state.write().await = AuthState::Expired;
                        Err(GatewayError::Authorization { tool: tool_name.to_string(), detail })
                    }
                    Err(other) => Err(self.terminal(tool_name, other)),
                }
            }
            Err(other) => Err(self.terminal(tool_name, other)),
        }
    }

    fn terminal(&self, tool_name: &str, err: TransportError) -> GatewayError {
        match err {
            TransportError::Unauthorized(detail) => {
                GatewayError::Authorization { tool: tool_name.to_string(), detail }
            }
            TransportError::Transient(detail) => GatewayError::Transient {
                tool: tool_name.to_string(),
                attempts: self.retry.max_retries + 1,
                detail,
            },
            TransportError::Fatal(detail) => {
                GatewayError::Tool { tool: tool_name.to_string(), detail }
            }
        }
    }

    async fn ensure_token(&self) -> Result<String, GatewayError> {
        {
            let state = self.state.read().await;
            if let AuthState::Authenticated(token) = &*state {
                if !token.is_expired() {
                    return Ok(token.access_token.clone());
                }
            }
        }
        self.refresh_token().await
    }

    async fn refresh_token(&self) -> Result<String, GatewayError> {
        let mut state = self.state.write().await;
        *state = AuthState::Expired;
        let token: CachedToken = self.credentials.fetch_token().await?;
        let access = token.access_token.clone();
        *state = AuthState::Authenticated(token);
        tracing::info!("gateway credential refreshed");
        Ok(access)
    }

    /// One logical call with bounded backoff over transient failures only.
    /// A per-call timeout counts as a transient failure.
    async fn call_with_retry(
        &self,
        tool_name: &str,
        invocation_id: &str,
        args: &Value,
        token: &str,
    ) -> Result<Value, TransportError> {
        let mut attempt: u32 = 0;
        let mut delay = self.retry.initial_delay;

        loop {
            let call = self.transport.call(tool_name, invocation_id, args, token);
            let outcome = match tokio::time::timeout(self.call_timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Transient(format!(
                    "call timed out after {:?}",
                    self.call_timeout
                ))),
            };

            match outcome {
                Err(TransportError::Transient(detail))
                    if self.retry.enabled && attempt < self.retry.max_retries =>
                {
                    attempt += 1;
                    tracing::warn!(
                        tool = tool_name,
                        attempt,
                        max_retries = self.retry.max_retries,
                        detail = %detail,
                        "transient gateway failure; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay.mul_f32(self.retry.backoff_multiplier.max(1.0)))
                        .min(self.retry.max_delay);
                }
                other => return other,
            }
        }
    }
}

/// Decodes the gateway's response envelope.
///
/// The gateway nests tool output as `{"content": [{"text": "<json>"}]}`;
/// plain objects pass through, and an `error` member is surfaced as a tool
/// failure.
pub fn parse_tool_payload(tool_name: &str, value: Value) -> Result<Value, GatewayError> {
    if let Some(text) = value
        .get("content")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(|item| item.get("text"))
        .and_then(Value::as_str)
    {
        return serde_json::from_str(text).map_err(|e| GatewayError::Malformed {
            tool: tool_name.to_string(),
            detail: format!("nested payload is not valid JSON: {e}"),
        });
    }

    if let Some(error) = value.get("error") {
        return Err(GatewayError::Tool {
            tool: tool_name.to_string(),
            detail: error.to_string(),
        });
    }

    Ok(value)
}
