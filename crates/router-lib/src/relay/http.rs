//! HTTP implementation of the protocol relay.
use std::time::Duration;

use async_trait::async_trait;
use meeting_router_common::{
    Operation, Params, Payload, ProtocolError, Server, RETURN_FAILED, RETURN_SUCCESS,
};
use reqwest::Client;
use serde_json::Value;

use super::{ProtocolRelay, RelayError, RequestSigner};

/// Relay that signs calls and performs them with `reqwest`
#[derive(Debug, Clone)]
pub struct HttpRelay {
    client: Client,
    signer: RequestSigner,
}

impl HttpRelay {
    /// Create a relay whose calls give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            signer: RequestSigner::new(),
        })
    }
}

#[async_trait]
impl ProtocolRelay for HttpRelay {
    async fn invoke(
        &self,
        operation: Operation,
        server: &Server,
        params: &Params,
    ) -> Result<Payload, RelayError> {
        let url = self
            .signer
            .signed_url(server, operation, params)
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        tracing::debug!(%operation, server_id = %server.id, "relaying call");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Transport(format!(
                "backend answered with status {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        decode_response(&body)
    }
}

/// Decode a backend reply envelope: `{"response": {"returncode": ..., ...}}`
pub fn decode_response(body: &str) -> Result<Payload, RelayError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| RelayError::Transport(format!("malformed reply: {e}")))?;

    let payload = match value {
        Value::Object(mut envelope) => match envelope.remove("response") {
            Some(Value::Object(payload)) => payload,
            _ => return Err(RelayError::Transport("reply has no response object".to_string())),
        },
        _ => return Err(RelayError::Transport("reply is not an object".to_string())),
    };

    let returncode = payload
        .get("returncode")
        .and_then(Value::as_str)
        .map(str::to_owned);

    match returncode.as_deref() {
        Some(RETURN_SUCCESS) => Ok(payload),
        Some(RETURN_FAILED) => {
            let field = |name: &str| {
                payload
                    .get(name)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            Err(RelayError::Protocol(ProtocolError::new(
                field("messageKey"),
                field("message"),
            )))
        },
        other => Err(RelayError::Transport(format!(
            "unexpected returncode: {}",
            other.unwrap_or("<missing>")
        ))),
    }
}
