use thiserror::Error;

use crate::{protocol::command_id::CommandId, wire::error::SerdeErr};

/// Errors that can occur while framing or decoding a packet.
///
/// All of these are protocol violations: the peer is corrupted or
/// incompatible, so the connection that produced them should be closed
/// rather than retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    /// Fewer bytes than a packet header were received
    #[error("Packet of {length} bytes is shorter than the {header} byte header")]
    HeaderTooShort {
        length: usize,
        header: usize,
    },

    /// The size recorded in the header disagrees with the received length
    #[error("Packet header declares {declared} bytes but {actual} bytes were received")]
    SizeMismatch {
        declared: u32,
        actual: usize,
    },

    /// The header carries a command id this build does not know
    #[error("Unknown command id {command_id} in packet header")]
    UnknownCommandId {
        command_id: u32,
    },

    /// A specific packet type was expected but a different command arrived
    #[error("Expected a {expected:?} packet, but received {actual:?}")]
    WrongPacketType {
        expected: CommandId,
        actual: CommandId,
    },

    /// The payload could not be decoded
    #[error("Malformed {command:?} payload: {source}")]
    MalformedPayload {
        command: CommandId,
        #[source]
        source: SerdeErr,
    },

    /// The payload decoded, but bytes were left over
    #[error("{command:?} payload has {remaining} unread trailing bytes")]
    TrailingBytes {
        command: CommandId,
        remaining: usize,
    },
}
