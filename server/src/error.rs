use std::{net::SocketAddr, time::Duration};

use thiserror::Error;

use lockstep_shared::{DispatchError, NodeKey, ObjectError, PacketError, PipeId, SendError};

use crate::node_proxy::NodeState;

/// Errors raised by the control process
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockstepServerError {
    /// The configuration tree is inconsistent
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },

    /// Two nodes of the configuration share a key
    #[error("Node {node} is described twice")]
    DuplicateNode {
        node: NodeKey,
    },

    /// Two pipes of the configuration share an id
    #[error("Pipe {pipe} is described twice")]
    DuplicatePipe {
        pipe: PipeId,
    },

    /// A reply or request named a node that is not part of the configuration
    #[error("Node {node} is not part of the configuration")]
    UnknownNode {
        node: NodeKey,
    },

    /// An operation needs the node in a different state
    #[error("Node {node} is {state:?}, cannot {operation}")]
    WrongState {
        node: NodeKey,
        state: NodeState,
        operation: &'static str,
    },

    /// A node answered CONFIG_INIT with a failure
    #[error("Node {node} failed to initialize: {reason}")]
    InitFailed {
        node: NodeKey,
        reason: String,
    },

    /// A bounded wait for node replies expired
    #[error("Timed out after {timeout:?} waiting for {what}")]
    ReplyTimeout {
        what: &'static str,
        timeout: Duration,
    },

    /// A peer broke the protocol and its connection was closed
    #[error("Connection to {peer} closed: {source}")]
    ProtocolViolation {
        peer: SocketAddr,
        #[source]
        source: DispatchError,
    },

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),

    #[error("Object error: {0}")]
    Object(#[from] ObjectError),

    #[error("Send error: {0}")]
    Send(#[from] SendError),
}
