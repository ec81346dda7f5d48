use crate::{
    object::{dirty_bits::DirtyBits, error::ObjectError, object_version::ObjectId},
    wire::{error::SerdeErr, reader::PacketReader, serde::Serde, writer::PacketWriter},
};

/// A type whose state can be replicated field by field.
///
/// `serialize` writes exactly the fields named by `dirty`, and
/// `deserialize` must read them back in the same order.
pub trait Versioned: Send + 'static {
    fn serialize(&self, writer: &mut PacketWriter, dirty: DirtyBits);

    fn deserialize(&mut self, reader: &mut PacketReader, dirty: DirtyBits)
        -> Result<(), SerdeErr>;
}

/// The serialized fields of one object version, as it travels between
/// master and replica
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectDelta {
    pub object_id: ObjectId,
    pub version: u32,
    pub dirty: DirtyBits,
    pub payload: Vec<u8>,
}

impl ObjectDelta {
    /// Serializes the fields of `value` selected by `dirty`
    pub fn capture<T: Versioned>(
        object_id: ObjectId,
        version: u32,
        dirty: DirtyBits,
        value: &T,
    ) -> Self {
        let mut writer = PacketWriter::new();
        value.serialize(&mut writer, dirty);
        Self {
            object_id,
            version,
            dirty,
            payload: writer.to_bytes(),
        }
    }

    /// Deserializes the carried fields into `value`
    pub fn apply_to<T: Versioned>(&self, value: &mut T) -> Result<(), ObjectError> {
        let mut reader = PacketReader::new(&self.payload);
        value
            .deserialize(&mut reader, self.dirty)
            .map_err(|source| ObjectError::Deserialize {
                object_id: self.object_id,
                version: self.version,
                source,
            })
    }
}

impl Serde for ObjectDelta {
    fn ser(&self, writer: &mut PacketWriter) {
        self.object_id.ser(writer);
        self.version.ser(writer);
        self.dirty.ser(writer);
        self.payload.ser(writer);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            object_id: ObjectId::de(reader)?,
            version: u32::de(reader)?,
            dirty: DirtyBits::de(reader)?,
            payload: Vec::<u8>::de(reader)?,
        })
    }
}
