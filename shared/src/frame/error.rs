use std::time::Duration;

use thiserror::Error;

use crate::{
    connection::error::{DecoderError, EncoderError},
    object::{error::ObjectError, object_version::ObjectId},
    transport::SendError,
    types::FrameNumber,
    wire::error::SerdeErr,
};

/// Errors that can occur while moving frame data between nodes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameDataError {
    /// The pixel payload could not be compressed
    #[error("Encoder error: {0}")]
    Encoder(#[from] EncoderError),

    /// A received pixel payload could not be decompressed
    #[error("Decoder error: {0}")]
    Decoder(#[from] DecoderError),

    /// A received pixel payload does not contain valid images
    #[error("Frame data {object_id:?} for frame {frame_number} is malformed: {source}")]
    Malformed {
        object_id: ObjectId,
        frame_number: FrameNumber,
        #[source]
        source: SerdeErr,
    },

    /// A transmission was delivered to the wrong frame data
    #[error("Transmission for {actual:?} was delivered to frame data {expected:?}")]
    WrongObject {
        expected: ObjectId,
        actual: ObjectId,
    },

    /// The images of a frame did not arrive in time
    #[error("Frame data {object_id:?} timed out after {timeout:?} waiting for frame {frame_number}")]
    ReadyTimeout {
        object_id: ObjectId,
        frame_number: FrameNumber,
        timeout: Duration,
    },

    /// The replicated frame data state could not be synced
    #[error("Object error: {0}")]
    Object(#[from] ObjectError),

    /// The transmission could not be sent
    #[error("Send error: {0}")]
    Send(#[from] SendError),
}
