// Errors surfaced by the join client.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetError {
    #[error("could not connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("host rejected the handshake: {0}")]
    Rejected(String),
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error("no message from host within {0:?}")]
    Timeout(Duration),
    #[error("connection to host lost")]
    HostLost,
    #[error("send failed: {0}")]
    Send(String),
}
