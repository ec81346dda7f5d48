use crate::{
    protocol::{command_id::CommandId, error::PacketError},
    wire::{reader::PacketReader, writer::PacketWriter},
};

/// Every packet starts with `{command_id: u32, size: u32}`, little-endian.
/// `size` counts the whole packet, header included.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacketHeader {
    pub command_id: u32,
    pub size: u32,
}

impl PacketHeader {
    pub const SIZE: usize = 8;

    pub fn new(command: CommandId, size: u32) -> Self {
        Self {
            command_id: command.to_u32(),
            size,
        }
    }

    /// Reads and validates the header of a complete packet
    pub fn read(packet: &[u8]) -> Result<Self, PacketError> {
        if packet.len() < Self::SIZE {
            return Err(PacketError::HeaderTooShort {
                length: packet.len(),
                header: Self::SIZE,
            });
        }

        let mut reader = PacketReader::new(packet);
        let (Ok(command_id), Ok(size)) = (reader.read_u32(), reader.read_u32()) else {
            return Err(PacketError::HeaderTooShort {
                length: packet.len(),
                header: Self::SIZE,
            });
        };

        if size as usize != packet.len() {
            return Err(PacketError::SizeMismatch {
                declared: size,
                actual: packet.len(),
            });
        }

        Ok(Self { command_id, size })
    }

    pub fn write(&self, writer: &mut PacketWriter) {
        writer.write_u32(self.command_id);
        writer.write_u32(self.size);
    }

    pub fn command(&self) -> Result<CommandId, PacketError> {
        CommandId::from_u32(self.command_id).ok_or(PacketError::UnknownCommandId {
            command_id: self.command_id,
        })
    }
}
