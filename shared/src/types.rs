use std::fmt;

use crate::wire::{error::SerdeErr, reader::PacketReader, serde::Serde, writer::PacketWriter};

pub type FrameNumber = u32;
pub type FrameId = u32;
pub type RequestId = u32;
pub type InitId = u32;

/// Identifies a Node (one worker process) within the cluster
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey(u32);

impl NodeKey {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn to_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

impl Serde for NodeKey {
    fn ser(&self, writer: &mut PacketWriter) {
        self.0.ser(writer);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self(u32::de(reader)?))
    }
}

/// Identifies a Pipe within the cluster. The owning Node is tracked separately.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PipeId(u32);

impl PipeId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn to_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pipe#{}", self.0)
    }
}

impl Serde for PipeId {
    fn ser(&self, writer: &mut PacketWriter) {
        self.0.ser(writer);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self(u32::de(reader)?))
    }
}

/// The kinds of work a Node has to perform during a frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TaskMask(u32);

impl TaskMask {
    pub const NONE: TaskMask = TaskMask(0);
    pub const CLEAR: TaskMask = TaskMask(1 << 0);
    pub const DRAW: TaskMask = TaskMask(1 << 1);
    pub const ASSEMBLE: TaskMask = TaskMask(1 << 2);
    pub const READBACK: TaskMask = TaskMask(1 << 3);
    pub const VIEW: TaskMask = TaskMask(1 << 4);
    pub const ALL: TaskMask = TaskMask(0x1F);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: TaskMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: TaskMask) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for TaskMask {
    type Output = TaskMask;

    fn bitor(self, rhs: TaskMask) -> TaskMask {
        self.union(rhs)
    }
}

impl Serde for TaskMask {
    fn ser(&self, writer: &mut PacketWriter) {
        self.0.ser(writer);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self::from_bits(u32::de(reader)?))
    }
}
