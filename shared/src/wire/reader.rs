use super::error::SerdeErr;

/// A cursor over a received payload. Every read is bounds checked, so a
/// truncated packet surfaces as a `SerdeErr` rather than a panic.
pub struct PacketReader<'b> {
    buffer: &'b [u8],
    offset: usize,
}

impl<'b> PacketReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'b [u8], SerdeErr> {
        if self.remaining() < count {
            return Err(SerdeErr::UnexpectedEnd {
                offset: self.offset,
                needed: count,
                available: self.remaining(),
            });
        }
        let bytes = &self.buffer[self.offset..self.offset + count];
        self.offset += count;
        Ok(bytes)
    }

    /// Returns the next `u32` without consuming it.
    pub fn peek_u32(&self) -> Result<u32, SerdeErr> {
        if self.remaining() < 4 {
            return Err(SerdeErr::UnexpectedEnd {
                offset: self.offset,
                needed: 4,
                available: self.remaining(),
            });
        }
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.buffer[self.offset..self.offset + 4]);
        Ok(u32::from_le_bytes(raw))
    }

    pub fn read_u8(&mut self) -> Result<u8, SerdeErr> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, SerdeErr> {
        let mut raw = [0u8; 2];
        raw.copy_from_slice(self.read_bytes(2)?);
        Ok(u16::from_le_bytes(raw))
    }

    pub fn read_u32(&mut self) -> Result<u32, SerdeErr> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.read_bytes(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    pub fn read_u64(&mut self) -> Result<u64, SerdeErr> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.read_bytes(8)?);
        Ok(u64::from_le_bytes(raw))
    }
}
