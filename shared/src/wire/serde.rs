use super::{error::SerdeErr, reader::PacketReader, writer::PacketWriter};

/// Upper bound on any length-prefixed field (SECURITY: bounds allocations driven by
/// untrusted length prefixes).
pub const MAX_FIELD_LENGTH: u32 = 64 * 1024 * 1024;

/// A type that can be written into and read back out of a packet payload.
pub trait Serde: Sized {
    fn ser(&self, writer: &mut PacketWriter);

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr>;
}

impl Serde for bool {
    fn ser(&self, writer: &mut PacketWriter) {
        writer.write_u8(u8::from(*self));
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        match reader.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(SerdeErr::InvalidDiscriminant {
                type_name: "bool",
                value: u32::from(value),
            }),
        }
    }
}

impl Serde for u8 {
    fn ser(&self, writer: &mut PacketWriter) {
        writer.write_u8(*self);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        reader.read_u8()
    }
}

impl Serde for u16 {
    fn ser(&self, writer: &mut PacketWriter) {
        writer.write_u16(*self);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        reader.read_u16()
    }
}

impl Serde for u32 {
    fn ser(&self, writer: &mut PacketWriter) {
        writer.write_u32(*self);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        reader.read_u32()
    }
}

impl Serde for u64 {
    fn ser(&self, writer: &mut PacketWriter) {
        writer.write_u64(*self);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        reader.read_u64()
    }
}

impl Serde for i32 {
    fn ser(&self, writer: &mut PacketWriter) {
        writer.write_u32(*self as u32);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(reader.read_u32()? as i32)
    }
}

impl Serde for f32 {
    fn ser(&self, writer: &mut PacketWriter) {
        writer.write_u32(self.to_bits());
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(f32::from_bits(reader.read_u32()?))
    }
}

impl<const N: usize, T: Serde + Copy + Default> Serde for [T; N] {
    fn ser(&self, writer: &mut PacketWriter) {
        for item in self {
            item.ser(writer);
        }
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        let mut output = [T::default(); N];
        for slot in output.iter_mut() {
            *slot = T::de(reader)?;
        }
        Ok(output)
    }
}

fn read_length(reader: &mut PacketReader) -> Result<usize, SerdeErr> {
    let length = reader.read_u32()?;
    if length > MAX_FIELD_LENGTH {
        return Err(SerdeErr::LengthLimitExceeded {
            length,
            limit: MAX_FIELD_LENGTH,
        });
    }
    Ok(length as usize)
}

impl Serde for String {
    fn ser(&self, writer: &mut PacketWriter) {
        writer.write_u32(self.len() as u32);
        writer.write_bytes(self.as_bytes());
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        let length = read_length(reader)?;
        let offset = reader.offset();
        let bytes = reader.read_bytes(length)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| SerdeErr::InvalidUtf8 { offset })
    }
}

impl Serde for Vec<u8> {
    fn ser(&self, writer: &mut PacketWriter) {
        writer.write_u32(self.len() as u32);
        writer.write_bytes(self);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        let length = read_length(reader)?;
        Ok(reader.read_bytes(length)?.to_vec())
    }
}

impl<T: Serde> Serde for Option<T> {
    fn ser(&self, writer: &mut PacketWriter) {
        match self {
            Some(value) => {
                true.ser(writer);
                value.ser(writer);
            }
            None => false.ser(writer),
        }
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        if bool::de(reader)? {
            Ok(Some(T::de(reader)?))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_with_oversized_length_prefix_is_rejected() {
        let mut writer = PacketWriter::new();
        writer.write_u32(MAX_FIELD_LENGTH + 1);
        let bytes = writer.to_bytes();

        let mut reader = PacketReader::new(&bytes);
        assert!(matches!(
            String::de(&mut reader),
            Err(SerdeErr::LengthLimitExceeded { .. })
        ));
    }

    #[test]
    fn invalid_bool_is_rejected() {
        let bytes = [2u8];
        let mut reader = PacketReader::new(&bytes);

        assert_eq!(
            bool::de(&mut reader),
            Err(SerdeErr::InvalidDiscriminant {
                type_name: "bool",
                value: 2
            })
        );
    }

    #[test]
    fn option_and_array_fields() {
        let mut writer = PacketWriter::new();
        Some(7u32).ser(&mut writer);
        None::<u32>.ser(&mut writer);
        [1.5f32, -2.0, 0.0, 4.25].ser(&mut writer);
        let bytes = writer.to_bytes();

        let mut reader = PacketReader::new(&bytes);
        assert_eq!(Option::<u32>::de(&mut reader), Ok(Some(7)));
        assert_eq!(Option::<u32>::de(&mut reader), Ok(None));
        assert_eq!(<[f32; 4]>::de(&mut reader), Ok([1.5, -2.0, 0.0, 4.25]));
        assert!(reader.is_empty());
    }
}
