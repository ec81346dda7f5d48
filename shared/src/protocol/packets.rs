use crate::{
    object::{object_version::{ObjectId, ObjectVersion}, versioned::ObjectDelta},
    protocol::{command_id::CommandId, Packet},
    thread_model::ThreadModel,
    types::{FrameId, FrameNumber, InitId, NodeKey, PipeId, RequestId, TaskMask},
    wire::{error::SerdeErr, reader::PacketReader, serde::Serde, writer::PacketWriter},
};

// Node commands

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeCreatePipePacket {
    pub node_id: NodeKey,
    pub pipe_id: PipeId,
    pub threaded: bool,
}

impl Packet for NodeCreatePipePacket {
    const COMMAND: CommandId = CommandId::CreatePipe;

    fn write_payload(&self, writer: &mut PacketWriter) {
        self.node_id.ser(writer);
        self.pipe_id.ser(writer);
        self.threaded.ser(writer);
    }

    fn read_payload(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            node_id: NodeKey::de(reader)?,
            pipe_id: PipeId::de(reader)?,
            threaded: bool::de(reader)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeDestroyPipePacket {
    pub node_id: NodeKey,
    pub pipe_id: PipeId,
}

impl Packet for NodeDestroyPipePacket {
    const COMMAND: CommandId = CommandId::DestroyPipe;

    fn write_payload(&self, writer: &mut PacketWriter) {
        self.node_id.ser(writer);
        self.pipe_id.ser(writer);
    }

    fn read_payload(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            node_id: NodeKey::de(reader)?,
            pipe_id: PipeId::de(reader)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeConfigInitPacket {
    pub node_id: NodeKey,
    pub request_id: RequestId,
    pub init_id: InitId,
    pub name: String,
    pub tasks: TaskMask,
    /// `None` leaves the choice to the node, which falls back to `ThreadModel::DEFAULT`
    pub thread_model: Option<ThreadModel>,
}

impl Packet for NodeConfigInitPacket {
    const COMMAND: CommandId = CommandId::ConfigInit;

    fn write_payload(&self, writer: &mut PacketWriter) {
        self.node_id.ser(writer);
        self.request_id.ser(writer);
        self.init_id.ser(writer);
        self.name.ser(writer);
        self.tasks.ser(writer);
        self.thread_model.ser(writer);
    }

    fn read_payload(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            node_id: NodeKey::de(reader)?,
            request_id: RequestId::de(reader)?,
            init_id: InitId::de(reader)?,
            name: String::de(reader)?,
            tasks: TaskMask::de(reader)?,
            thread_model: Option::<ThreadModel>::de(reader)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeConfigInitReplyPacket {
    pub node_id: NodeKey,
    pub request_id: RequestId,
    pub result: bool,
    pub error: String,
}

impl NodeConfigInitReplyPacket {
    pub fn new(request: &NodeConfigInitPacket, result: bool, error: String) -> Self {
        Self {
            node_id: request.node_id,
            request_id: request.request_id,
            result,
            error,
        }
    }
}

impl Packet for NodeConfigInitReplyPacket {
    const COMMAND: CommandId = CommandId::ConfigInitReply;

    fn write_payload(&self, writer: &mut PacketWriter) {
        self.node_id.ser(writer);
        self.request_id.ser(writer);
        self.result.ser(writer);
        self.error.ser(writer);
    }

    fn read_payload(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            node_id: NodeKey::de(reader)?,
            request_id: RequestId::de(reader)?,
            result: bool::de(reader)?,
            error: String::de(reader)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeConfigExitPacket {
    pub node_id: NodeKey,
    pub request_id: RequestId,
}

impl Packet for NodeConfigExitPacket {
    const COMMAND: CommandId = CommandId::ConfigExit;

    fn write_payload(&self, writer: &mut PacketWriter) {
        self.node_id.ser(writer);
        self.request_id.ser(writer);
    }

    fn read_payload(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            node_id: NodeKey::de(reader)?,
            request_id: RequestId::de(reader)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeConfigExitReplyPacket {
    pub node_id: NodeKey,
    pub request_id: RequestId,
    pub result: bool,
}

impl NodeConfigExitReplyPacket {
    pub fn new(request: &NodeConfigExitPacket, result: bool) -> Self {
        Self {
            node_id: request.node_id,
            request_id: request.request_id,
            result,
        }
    }
}

impl Packet for NodeConfigExitReplyPacket {
    const COMMAND: CommandId = CommandId::ConfigExitReply;

    fn write_payload(&self, writer: &mut PacketWriter) {
        self.node_id.ser(writer);
        self.request_id.ser(writer);
        self.result.ser(writer);
    }

    fn read_payload(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            node_id: NodeKey::de(reader)?,
            request_id: RequestId::de(reader)?,
            result: bool::de(reader)?,
        })
    }
}

// Frame commands. Start, draw-finish and tasks-finish share one layout.

macro_rules! frame_packet {
    ($name:ident, $command:expr) => {
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub struct $name {
            pub node_id: NodeKey,
            pub frame_id: FrameId,
            pub frame_number: FrameNumber,
        }

        impl Packet for $name {
            const COMMAND: CommandId = $command;

            fn write_payload(&self, writer: &mut PacketWriter) {
                self.node_id.ser(writer);
                self.frame_id.ser(writer);
                self.frame_number.ser(writer);
            }

            fn read_payload(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
                Ok(Self {
                    node_id: NodeKey::de(reader)?,
                    frame_id: FrameId::de(reader)?,
                    frame_number: FrameNumber::de(reader)?,
                })
            }
        }
    };
}

frame_packet!(NodeFrameStartPacket, CommandId::FrameStart);
frame_packet!(NodeFrameDrawFinishPacket, CommandId::FrameDrawFinish);
frame_packet!(NodeFrameTasksFinishPacket, CommandId::FrameTasksFinish);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeFrameFinishPacket {
    pub node_id: NodeKey,
    pub frame_id: FrameId,
    pub frame_number: FrameNumber,
    /// Also wait until every node of the config has finished the frame
    pub sync_global_finish: bool,
}

impl Packet for NodeFrameFinishPacket {
    const COMMAND: CommandId = CommandId::FrameFinish;

    fn write_payload(&self, writer: &mut PacketWriter) {
        self.node_id.ser(writer);
        self.frame_id.ser(writer);
        self.frame_number.ser(writer);
        self.sync_global_finish.ser(writer);
    }

    fn read_payload(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            node_id: NodeKey::de(reader)?,
            frame_id: FrameId::de(reader)?,
            frame_number: FrameNumber::de(reader)?,
            sync_global_finish: bool::de(reader)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeFrameFinishReplyPacket {
    pub node_id: NodeKey,
    pub frame_number: FrameNumber,
}

impl Packet for NodeFrameFinishReplyPacket {
    const COMMAND: CommandId = CommandId::FrameFinishReply;

    fn write_payload(&self, writer: &mut PacketWriter) {
        self.node_id.ser(writer);
        self.frame_number.ser(writer);
    }

    fn read_payload(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            node_id: NodeKey::de(reader)?,
            frame_number: FrameNumber::de(reader)?,
        })
    }
}

// Object replication

/// Full state of a master object at `delta.version`, sent when a peer subscribes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectInstancePacket {
    pub delta: ObjectDelta,
}

impl Packet for ObjectInstancePacket {
    const COMMAND: CommandId = CommandId::ObjectInstance;

    fn write_payload(&self, writer: &mut PacketWriter) {
        self.delta.ser(writer);
    }

    fn read_payload(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            delta: ObjectDelta::de(reader)?,
        })
    }
}

/// Dirty fields of a master object committed as `delta.version`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectDeltaPacket {
    pub delta: ObjectDelta,
}

impl Packet for ObjectDeltaPacket {
    const COMMAND: CommandId = CommandId::ObjectDelta;

    fn write_payload(&self, writer: &mut PacketWriter) {
        self.delta.ser(writer);
    }

    fn read_payload(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            delta: ObjectDelta::de(reader)?,
        })
    }
}

// Barrier

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BarrierEnterPacket {
    pub barrier_id: ObjectId,
    pub version: u32,
}

impl Packet for BarrierEnterPacket {
    const COMMAND: CommandId = CommandId::BarrierEnter;

    fn write_payload(&self, writer: &mut PacketWriter) {
        self.barrier_id.ser(writer);
        self.version.ser(writer);
    }

    fn read_payload(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            barrier_id: ObjectId::de(reader)?,
            version: u32::de(reader)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BarrierEnterReplyPacket {
    pub barrier_id: ObjectId,
    pub version: u32,
}

impl Packet for BarrierEnterReplyPacket {
    const COMMAND: CommandId = CommandId::BarrierEnterReply;

    fn write_payload(&self, writer: &mut PacketWriter) {
        self.barrier_id.ser(writer);
        self.version.ser(writer);
    }

    fn read_payload(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            barrier_id: ObjectId::de(reader)?,
            version: u32::de(reader)?,
        })
    }
}

// Frame data

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameDataTransmitPacket {
    pub data: ObjectVersion,
    pub frame_number: FrameNumber,
    /// Whether `payload` went through the connection encoder
    pub compressed: bool,
    pub payload: Vec<u8>,
}

impl Packet for FrameDataTransmitPacket {
    const COMMAND: CommandId = CommandId::FrameDataTransmit;

    fn write_payload(&self, writer: &mut PacketWriter) {
        self.data.ser(writer);
        self.frame_number.ser(writer);
        self.compressed.ser(writer);
        self.payload.ser(writer);
    }

    fn read_payload(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            data: ObjectVersion::de(reader)?,
            frame_number: FrameNumber::de(reader)?,
            compressed: bool::de(reader)?,
            payload: Vec::<u8>::de(reader)?,
        })
    }
}
