use std::net::SocketAddr;

use thiserror::Error;

/// Errors that can occur while handing a packet to the transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// No endpoint is bound at the destination address
    #[error("No endpoint is bound at {address}")]
    Unreachable {
        address: SocketAddr,
    },

    /// The destination endpoint was bound, but has since gone away
    #[error("Connection to {address} is closed")]
    Disconnected {
        address: SocketAddr,
    },
}

/// Errors that can occur while receiving from the transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecvError {
    /// Every sender feeding this endpoint has been dropped
    #[error("Endpoint {address} has no remaining senders")]
    Disconnected {
        address: SocketAddr,
    },
}

/// General transport-level errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Send error: {0}")]
    Send(#[from] SendError),

    #[error("Receive error: {0}")]
    Recv(#[from] RecvError),

    /// An address was bound twice on the same network
    #[error("Address {address} is already bound")]
    AddressInUse {
        address: SocketAddr,
    },
}
