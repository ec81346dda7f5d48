use std::time::Duration;

use thiserror::Error;

use lockstep_shared::{
    DecoderError, DispatchError, EncoderError, FrameDataError, FrameNumber, NodeKey, ObjectError, ObjectId,
    PacketError, PipeId, SendError,
};

/// Errors raised by a node while executing commands
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// A pipe command named a pipe this node does not have
    #[error("Node {node} has no pipe {pipe}")]
    PipeNotFound {
        node: NodeKey,
        pipe: PipeId,
    },

    /// CREATE_PIPE named a pipe that already exists
    #[error("Node {node} already has pipe {pipe}")]
    PipeExists {
        node: NodeKey,
        pipe: PipeId,
    },

    /// A command was addressed to a node this process does not host
    #[error("Node {node} is not hosted by this process")]
    UnknownNode {
        node: NodeKey,
    },

    /// A frame watermark would move backwards
    #[error("Node {node} cannot {operation} frame {frame_number}: watermark is already at {watermark}")]
    FrameOutOfOrder {
        node: NodeKey,
        operation: &'static str,
        frame_number: FrameNumber,
        watermark: FrameNumber,
    },

    /// A frame was released before it was started
    #[error("Node {node} cannot release frame {frame_number}: current frame is {current}")]
    FrameNotStarted {
        node: NodeKey,
        frame_number: FrameNumber,
        current: FrameNumber,
    },

    /// No command from the control process has been received yet
    #[error("Node {node} does not know the address of the control process")]
    NoServer {
        node: NodeKey,
    },

    /// A bounded wait expired
    #[error("Timed out after {timeout:?} waiting for {what} of frame {frame_number}")]
    WaitTimeout {
        what: &'static str,
        frame_number: FrameNumber,
        timeout: Duration,
    },

    /// A transmission named frame data the node has not mapped
    #[error("Node {node} has no frame data {object_id}")]
    UnknownFrameData {
        node: NodeKey,
        object_id: ObjectId,
    },

    /// A pipe thread could not be started
    #[error("Failed to spawn thread '{name}': {message}")]
    Spawn {
        name: String,
        message: String,
    },

    /// The node has not received CONFIG_INIT yet
    #[error("Node {node} is not initialized")]
    NotInitialized {
        node: NodeKey,
    },

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),

    #[error("Object error: {0}")]
    Object(#[from] ObjectError),

    #[error("Frame data error: {0}")]
    FrameData(#[from] FrameDataError),

    #[error("Transmit error: {0}")]
    Transmit(#[from] TransmitError),

    #[error("Send error: {0}")]
    Send(#[from] SendError),
}

/// Errors of the asynchronous transmit worker
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransmitError {
    /// The worker has been shut down and accepts no more tasks
    #[error("Transmit worker '{name}' is stopped")]
    Stopped {
        name: String,
    },

    /// The worker's encoder could not be created
    #[error("Encoder error: {0}")]
    Encoder(#[from] EncoderError),

    /// The worker thread could not be started
    #[error("Failed to spawn transmit worker '{name}': {message}")]
    Spawn {
        name: String,
        message: String,
    },
}

/// Errors raised while setting up or running a worker process
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockstepClientError {
    /// `create_node` was called twice for the same key
    #[error("Node {node} already exists in this process")]
    NodeExists {
        node: NodeKey,
    },

    /// A thread could not be started
    #[error("Failed to spawn thread '{name}': {message}")]
    Spawn {
        name: String,
        message: String,
    },

    /// The frame data decoder could not be created
    #[error("Decoder error: {0}")]
    Decoder(#[from] DecoderError),

    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}
