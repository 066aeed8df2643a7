use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::Value;

/// Wire-level call to the remote gateway. Implementations classify failures
/// so the client can decide between credential refresh, retry, and giving up.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn call(
        &self,
        tool_name: &str,
        invocation_id: &str,
        args: &Value,
        bearer_token: &str,
    ) -> Result<Value, TransportError>;
}

/// HTTP transport posting tool invocations to a gateway endpoint.
#[cfg(feature = "http-transport")]
pub struct HttpTransport {
    endpoint: String,
    client: reqwest::Client,
}

#[cfg(feature = "http-transport")]
impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), client: reqwest::Client::new() }
    }
}

#[cfg(feature = "http-transport")]
#[async_trait]
impl GatewayTransport for HttpTransport {
    async fn call(
        &self,
        tool_name: &str,
        invocation_id: &str,
        args: &Value,
        bearer_token: &str,
    ) -> Result<Value, TransportError> {
        let body = serde_json::json!({
            "invocation_id": invocation_id,
            "name": tool_name,
            "arguments": args,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(bearer_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    TransportError::Transient(e.to_string())
                } else {
                    TransportError::Fatal(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Unauthorized(format!("{status}: {body}")));
        }
        if archpilot_core::is_retryable_status_code(status.as_u16()) {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Transient(format!("{status}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Fatal(format!("{status}: {body}")));
        }

        response.json().await.map_err(|e| TransportError::Fatal(e.to_string()))
    }
}
