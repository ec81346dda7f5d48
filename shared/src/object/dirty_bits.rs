use crate::wire::{error::SerdeErr, reader::PacketReader, serde::Serde, writer::PacketWriter};

/// Which logical fields of a versioned object changed since the last commit.
///
/// Bits below `DirtyBits::CUSTOM` are reserved; object types define their
/// own fields as `DirtyBits::custom(0)`, `DirtyBits::custom(1)`, ...
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DirtyBits(u64);

impl DirtyBits {
    pub const NONE: DirtyBits = DirtyBits(0);
    pub const ALL: DirtyBits = DirtyBits(u64::MAX);
    pub const NAME: DirtyBits = DirtyBits(1 << 0);
    pub const USER_DATA: DirtyBits = DirtyBits(1 << 1);
    /// First bit available to object types
    pub const CUSTOM: u32 = 4;

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// The `index`th object-specific field
    pub const fn custom(index: u32) -> Self {
        Self(1 << (Self::CUSTOM + index))
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn is_clear(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: DirtyBits) -> bool {
        self.0 & other.0 != 0
    }

    pub fn set(&mut self, other: DirtyBits) {
        self.0 |= other.0;
    }

    pub fn or(&mut self, other: &DirtyBits) {
        self.0 |= other.0;
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

impl std::ops::BitOr for DirtyBits {
    type Output = DirtyBits;

    fn bitor(self, rhs: DirtyBits) -> DirtyBits {
        DirtyBits(self.0 | rhs.0)
    }
}

impl Serde for DirtyBits {
    fn ser(&self, writer: &mut PacketWriter) {
        self.0.ser(writer);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self(u64::de(reader)?))
    }
}
