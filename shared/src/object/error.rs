use std::time::Duration;

use thiserror::Error;

use crate::{
    object::object_version::ObjectId,
    protocol::{CommandId, PacketError},
    transport::SendError,
    wire::error::SerdeErr,
};

/// Errors that can occur during object replication
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectError {
    /// A replica was asked to sync to a version older than the one it already applied
    #[error("Object {object_id:?} cannot sync back to version {requested}: version {applied} is already applied")]
    StaleVersion {
        object_id: ObjectId,
        requested: u32,
        applied: u32,
    },

    /// A delta skipped one or more versions (protocol violation)
    #[error("Object {object_id:?} expected delta version {expected}, but received {received}")]
    VersionGap {
        object_id: ObjectId,
        expected: u32,
        received: u32,
    },

    /// A delta arrived before the instance data it builds upon (protocol violation)
    #[error("Object {object_id:?} received delta version {received} before any instance data")]
    MissingInstance {
        object_id: ObjectId,
        received: u32,
    },

    /// Instance data arrived for a replica that already has one (protocol violation)
    #[error("Object {object_id:?} received a second instance (version {received})")]
    DuplicateInstance {
        object_id: ObjectId,
        received: u32,
    },

    /// The requested version did not arrive in time
    #[error("Object {object_id:?} timed out after {timeout:?} syncing to version {requested} (applied {applied})")]
    SyncTimeout {
        object_id: ObjectId,
        requested: u32,
        applied: u32,
        timeout: Duration,
    },

    /// The barrier was not released in time
    #[error("Barrier {barrier_id:?} timed out after {timeout:?} waiting for version {version}")]
    BarrierTimeout {
        barrier_id: ObjectId,
        version: u32,
        timeout: Duration,
    },

    /// The replica has no synced state yet
    #[error("Object {object_id:?} has not been synced yet")]
    NotSynced {
        object_id: ObjectId,
    },

    /// The object was unmapped while the operation was pending
    #[error("Object {object_id:?} is unmapped")]
    Unmapped {
        object_id: ObjectId,
    },

    /// A replica is already mapped for this id
    #[error("Object {object_id:?} is already mapped in this session")]
    AlreadyMapped {
        object_id: ObjectId,
    },

    /// The operation needs a registered master for this id
    #[error("Object {object_id:?} is not registered as a master in this session")]
    UnknownMaster {
        object_id: ObjectId,
    },

    /// A delta was addressed to a different object
    #[error("Delta for object {actual:?} was applied to object {expected:?}")]
    WrongObject {
        expected: ObjectId,
        actual: ObjectId,
    },

    /// The operation is only valid on the master (or only on a replica)
    #[error("Operation '{operation}' is not valid on this instance of object {object_id:?}")]
    WrongRole {
        object_id: ObjectId,
        operation: &'static str,
    },

    /// The object could not be deserialized from a delta
    #[error("Object {object_id:?} failed to deserialize version {version}: {source}")]
    Deserialize {
        object_id: ObjectId,
        version: u32,
        #[source]
        source: SerdeErr,
    },

    /// The session received a command it does not handle
    #[error("Object session cannot handle command {command:?}")]
    UnexpectedCommand {
        command: CommandId,
    },

    /// A packet could not be decoded
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),

    /// A packet could not be sent
    #[error("Send error: {0}")]
    Send(#[from] SendError),
}

impl ObjectError {
    /// Whether this error indicates a corrupted or incompatible peer
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            ObjectError::VersionGap { .. }
                | ObjectError::MissingInstance { .. }
                | ObjectError::DuplicateInstance { .. }
                | ObjectError::WrongObject { .. }
                | ObjectError::Deserialize { .. }
                | ObjectError::UnexpectedCommand { .. }
                | ObjectError::Packet(_)
        )
    }
}
