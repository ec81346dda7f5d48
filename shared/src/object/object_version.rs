use std::fmt;

use crate::wire::{error::SerdeErr, reader::PacketReader, serde::Serde, writer::PacketWriter};

/// No version: a replica that has not applied any data yet
pub const VERSION_NONE: u32 = 0;
/// The version of a freshly registered master
pub const VERSION_FIRST: u32 = 1;

/// Identifies a distributed object within a session
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u32);

impl ObjectId {
    pub const INVALID: ObjectId = ObjectId(0);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn to_u32(self) -> u32 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

impl Serde for ObjectId {
    fn ser(&self, writer: &mut PacketWriter) {
        self.0.ser(writer);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self(u32::de(reader)?))
    }
}

/// An object identity pinned to one version, as carried in frame commands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectVersion {
    pub id: ObjectId,
    pub version: u32,
}

impl ObjectVersion {
    pub const fn new(id: ObjectId, version: u32) -> Self {
        Self { id, version }
    }
}

impl Serde for ObjectVersion {
    fn ser(&self, writer: &mut PacketWriter) {
        self.id.ser(writer);
        self.version.ser(writer);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            id: ObjectId::de(reader)?,
            version: u32::de(reader)?,
        })
    }
}
