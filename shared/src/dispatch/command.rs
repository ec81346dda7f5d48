use std::net::SocketAddr;

use crate::protocol::{CommandId, Packet, PacketError, PacketHeader};

/// A received packet, tagged with the peer that sent it
#[derive(Clone, Debug)]
pub struct Command {
    source: SocketAddr,
    command: CommandId,
    payload: Box<[u8]>,
}

impl Command {
    /// Validates the header of a received packet and splits off its payload
    pub fn parse(source: SocketAddr, packet: &[u8]) -> Result<Self, PacketError> {
        let header = PacketHeader::read(packet)?;
        let command = header.command()?;

        Ok(Self {
            source,
            command,
            payload: packet[PacketHeader::SIZE..].into(),
        })
    }

    /// Builds a command from a typed packet, as if `source` had sent it
    pub fn from_packet<P: Packet>(source: SocketAddr, packet: &P) -> Self {
        let bytes = packet.encode();
        Self {
            source,
            command: P::COMMAND,
            payload: bytes[PacketHeader::SIZE..].into(),
        }
    }

    pub fn source(&self) -> SocketAddr {
        self.source
    }

    pub fn command(&self) -> CommandId {
        self.command
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Decodes the payload as `P`. Fails with `WrongPacketType` if this command
    /// carries a different packet.
    pub fn packet<P: Packet>(&self) -> Result<P, PacketError> {
        P::decode_payload(self.command, &self.payload)
    }
}
