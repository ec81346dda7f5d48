use std::fmt::Debug;

use crate::wire::{
    error::SerdeErr, reader::PacketReader, writer::PacketWriter,
};

pub mod command_id;
pub mod error;
pub mod packet_header;
pub mod packets;

pub use command_id::CommandId;
pub use error::PacketError;
pub use packet_header::PacketHeader;

/// A typed packet: a fixed header naming `COMMAND`, followed by the payload
/// written by `write_payload`.
pub trait Packet: Sized + Debug {
    const COMMAND: CommandId;

    fn write_payload(&self, writer: &mut PacketWriter);

    fn read_payload(reader: &mut PacketReader) -> Result<Self, SerdeErr>;

    /// Frames this packet (header + payload) into a buffer ready to send
    fn encode(&self) -> Vec<u8> {
        let mut writer = PacketWriter::new();
        PacketHeader::new(Self::COMMAND, 0).write(&mut writer);
        self.write_payload(&mut writer);
        let size = writer.len() as u32;
        writer.patch_u32(4, size);
        writer.to_bytes()
    }

    /// Decodes a complete framed packet, checking that it carries `COMMAND`
    fn decode(packet: &[u8]) -> Result<Self, PacketError> {
        let header = PacketHeader::read(packet)?;
        let command = header.command()?;
        Self::decode_payload(command, &packet[PacketHeader::SIZE..])
    }

    /// Decodes a payload whose header has already been read
    fn decode_payload(command: CommandId, payload: &[u8]) -> Result<Self, PacketError> {
        if command != Self::COMMAND {
            return Err(PacketError::WrongPacketType {
                expected: Self::COMMAND,
                actual: command,
            });
        }

        let mut reader = PacketReader::new(payload);
        let packet = Self::read_payload(&mut reader).map_err(|source| {
            PacketError::MalformedPayload {
                command: Self::COMMAND,
                source,
            }
        })?;

        if !reader.is_empty() {
            return Err(PacketError::TrailingBytes {
                command: Self::COMMAND,
                remaining: reader.remaining(),
            });
        }

        Ok(packet)
    }
}
