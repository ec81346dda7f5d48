use crate::wire::{
    error::SerdeErr, reader::PacketReader, serde::Serde, serde::MAX_FIELD_LENGTH,
    writer::PacketWriter,
};

/// A rectangle of read-back pixels produced by one pipe
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    /// x, y, width, height
    pub pixel_viewport: [u32; 4],
    /// Which of `FrameDataState::BUFFER_*` the pixels hold
    pub buffers: u32,
    pub pixels: Vec<u8>,
}

impl Image {
    pub fn new(pixel_viewport: [u32; 4], buffers: u32, pixels: Vec<u8>) -> Self {
        Self {
            pixel_viewport,
            buffers,
            pixels,
        }
    }
}

impl Serde for Image {
    fn ser(&self, writer: &mut PacketWriter) {
        self.pixel_viewport.ser(writer);
        self.buffers.ser(writer);
        self.pixels.ser(writer);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            pixel_viewport: <[u32; 4]>::de(reader)?,
            buffers: u32::de(reader)?,
            pixels: Vec::<u8>::de(reader)?,
        })
    }
}

pub(crate) fn write_images(images: &[Image], writer: &mut PacketWriter) {
    writer.write_u32(images.len() as u32);
    for image in images {
        image.ser(writer);
    }
}

pub(crate) fn read_images(reader: &mut PacketReader) -> Result<Vec<Image>, SerdeErr> {
    let count = reader.read_u32()?;
    if count > MAX_FIELD_LENGTH {
        return Err(SerdeErr::LengthLimitExceeded {
            length: count,
            limit: MAX_FIELD_LENGTH,
        });
    }

    // every image takes at least 24 bytes, so a short payload fails early
    let mut images = Vec::with_capacity((count as usize).min(reader.remaining() / 24));
    for _ in 0..count {
        images.push(Image::de(reader)?);
    }
    Ok(images)
}
