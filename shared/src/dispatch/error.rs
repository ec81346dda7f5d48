use thiserror::Error;

use crate::protocol::{CommandId, PacketError};

/// Errors that can occur while routing or executing commands
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No route is registered for the command (protocol violation, fatal for the connection)
    #[error("No handler registered for command {command:?}. The peer is incompatible or corrupted")]
    UnknownCommand {
        command: CommandId,
    },

    /// A route for the command already exists
    #[error("Command {command:?} is already registered with this dispatcher")]
    AlreadyRegistered {
        command: CommandId,
    },

    /// The queue the command is routed to no longer has a consumer
    #[error("Queue for command {command:?} is closed")]
    QueueClosed {
        command: CommandId,
    },

    /// A command reached a queue consumer that has no function for it
    #[error("Queue consumer has no handler function for command {command:?}")]
    NoHandlerFunction {
        command: CommandId,
    },

    /// A receiver handler rejected the command
    #[error("Handler for command {command:?} failed: {reason}")]
    HandlerFailed {
        command: CommandId,
        reason: String,
        /// Whether the sender broke the protocol
        protocol_violation: bool,
    },

    /// The receiver thread could not be started
    #[error("Failed to spawn thread '{name}': {message}")]
    Spawn {
        name: String,
        message: String,
    },

    /// The packet could not be framed or decoded
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),
}

impl DispatchError {
    /// Whether this error means the connection it came from must be closed
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            DispatchError::UnknownCommand { .. }
                | DispatchError::Packet(_)
                | DispatchError::HandlerFailed {
                    protocol_violation: true,
                    ..
                }
        )
    }
}
