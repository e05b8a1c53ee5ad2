// crates/router-lib/src/relay/mod.rs

//! Protocol relay: performs one backend call and classifies its outcome.

mod http;
mod signer;

pub use http::{decode_response, HttpRelay};
pub use signer::{RequestSigner, SignerError, CHECKSUM_PARAM};

use async_trait::async_trait;
use meeting_router_common::{Operation, Params, Payload, ProtocolError, Server};
use thiserror::Error;

/// Outcome classes of a failed relay call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RelayError {
    /// The backend answered with a structured failure
    #[error("backend returned {0}")]
    Protocol(ProtocolError),

    /// Network failure, timeout, bad status or undecodable reply
    #[error("transport failure: {0}")]
    Transport(String),
}

/// A single logical call to a backend server.
///
/// Implementations sign the request, perform it and decode the reply. They
/// make exactly one attempt.
#[async_trait]
pub trait ProtocolRelay: Send + Sync {
    async fn invoke(
        &self,
        operation: Operation,
        server: &Server,
        params: &Params,
    ) -> Result<Payload, RelayError>;
}
