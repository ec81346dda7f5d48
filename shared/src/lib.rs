//! # Lockstep Shared
//! Common functionality shared between lockstep-server & lockstep-client crates:
//! the packet protocol, command dispatch, versioned objects, barriers and
//! frame data.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

#[macro_use]
extern crate cfg_if;

mod connection;
mod dispatch;
mod frame;
mod object;
mod protocol;
mod thread_model;
mod transport;
mod tree_stream;
mod types;
mod wire;

pub use connection::{
    compression_config::{CompressionConfig, CompressionMode},
    decoder::Decoder,
    encoder::{Encoded, Encoder},
    error::{ConnectionError, DecoderError, EncoderError},
};
pub use dispatch::{
    command::Command,
    command_queue::{CommandQueue, QueueItem},
    dispatcher::{CommandDispatcher, CommandTarget, ReceiverHandler},
    error::DispatchError,
    handlers::{CommandFunc, CommandHandlers},
    receiver_thread::{ReceiverThread, ViolationHandler},
};
pub use frame::{
    error::FrameDataError,
    frame_data::{FrameData, FrameDataState, TransmitStats},
    image::Image,
};
pub use object::{
    Barrier, BarrierData, Commit, DirtyBits, Master, ObjectDelta, ObjectError, ObjectId,
    ObjectSession, ObjectVersion, Replica, ReplicaSink, Versioned, VERSION_FIRST, VERSION_NONE,
};
pub use protocol::{
    packets::{
        BarrierEnterPacket, BarrierEnterReplyPacket, FrameDataTransmitPacket,
        NodeConfigExitPacket, NodeConfigExitReplyPacket, NodeConfigInitPacket,
        NodeConfigInitReplyPacket, NodeCreatePipePacket, NodeDestroyPipePacket,
        NodeFrameDrawFinishPacket, NodeFrameFinishPacket, NodeFrameFinishReplyPacket,
        NodeFrameStartPacket, NodeFrameTasksFinishPacket, ObjectDeltaPacket,
        ObjectInstancePacket,
    },
    CommandId, Packet, PacketError, PacketHeader,
};
pub use thread_model::{FrameStage, LocalRelease, ThreadModel};
pub use transport::{
    LocalNetwork, PacketReceiver, PacketSender, PacketSenderClone, RecvError, SendError,
    TransportError,
};
pub use tree_stream::{
    load_tree, read_tree, save_tree, write_tree, Bounds, TreeNode, TreeStreamError, MAX_DEPTH,
    TAG_LEAF, TAG_REGULAR,
};
pub use types::{FrameId, FrameNumber, InitId, NodeKey, PipeId, RequestId, TaskMask};
pub use wire::{
    error::SerdeErr, reader::PacketReader, serde::Serde, serde::MAX_FIELD_LENGTH,
    writer::PacketWriter,
};
