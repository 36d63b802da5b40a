//! Operand fields: a bitmask paired with its semantic kind and metadata tags.

use bitflags::bitflags;

use super::bitmask::Bitmask;
use super::error::IsaError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperandKind {
    Constant,
    Register,
    RomAddress,
    RamAddress,
}

impl OperandKind {
    pub fn is_address(self) -> bool {
        matches!(self, OperandKind::RomAddress | OperandKind::RamAddress)
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct OperandFlags: u8 {
        /// The operation writes through this operand.
        const DESTINATION = 0b0001;
        /// The operand names memory reached through it rather than the value itself.
        const INDIRECT = 0b0010;
    }
}

/// Optional metadata carried by an operand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct OperandTags {
    pub flags: OperandFlags,
    /// When set, the field must hold exactly this value for the encoding to be meaningful.
    pub exact: Option<u16>,
}

impl OperandTags {
    pub fn new(flags: OperandFlags) -> Self {
        Self { flags, exact: None }
    }

    pub fn with_exact(mut self, value: u16) -> Self {
        self.exact = Some(value);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Operand {
    mask: Bitmask,
    kind: OperandKind,
    tags: OperandTags,
}

impl Operand {
    pub fn new(mask: impl Into<Bitmask>, kind: OperandKind) -> Self {
        Self {
            mask: mask.into(),
            kind,
            tags: OperandTags::default(),
        }
    }

    pub fn constant(mask: u16) -> Self {
        Self::new(mask, OperandKind::Constant)
    }

    pub fn register(mask: u16) -> Self {
        Self::new(mask, OperandKind::Register)
    }

    pub fn rom_address(mask: u16) -> Self {
        Self::new(mask, OperandKind::RomAddress)
    }

    pub fn ram_address(mask: u16) -> Self {
        Self::new(mask, OperandKind::RamAddress)
    }

    pub fn with_tags(mut self, tags: OperandTags) -> Self {
        self.tags = tags;
        self
    }

    pub fn destination(mut self) -> Self {
        self.tags.flags |= OperandFlags::DESTINATION;
        self
    }

    pub fn indirect(mut self) -> Self {
        self.tags.flags |= OperandFlags::INDIRECT;
        self
    }

    pub fn exact(mut self, value: u16) -> Self {
        self.tags.exact = Some(value);
        self
    }

    pub fn mask(&self) -> &Bitmask {
        &self.mask
    }

    pub fn kind(&self) -> OperandKind {
        self.kind
    }

    pub fn tags(&self) -> &OperandTags {
        &self.tags
    }

    pub fn is_destination(&self) -> bool {
        self.tags.flags.contains(OperandFlags::DESTINATION)
    }

    pub fn is_indirect(&self) -> bool {
        self.tags.flags.contains(OperandFlags::INDIRECT)
    }

    pub fn decode(&self, word: u16) -> u16 {
        self.mask.extract(word)
    }

    /// Places `value` into an otherwise empty word; bits outside the field are dropped.
    pub fn encode(&self, value: u16) -> u16 {
        self.mask.emplace_masked(value, 0)
    }

    /// Checks the `exact` tag, if any.
    pub fn accepts(&self, value: u16) -> bool {
        self.tags.exact.is_none_or(|exact| exact == value)
    }
}

/// Record form of an operand as supplied by an architecture definition table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperandDescriptor {
    pub mask: u32,
    pub kind: OperandKind,
    pub tags: Option<OperandTags>,
}

impl OperandDescriptor {
    pub fn new(mask: u32, kind: OperandKind) -> Self {
        Self {
            mask,
            kind,
            tags: None,
        }
    }
}

impl TryFrom<OperandDescriptor> for Operand {
    type Error = IsaError;

    fn try_from(desc: OperandDescriptor) -> Result<Self, Self::Error> {
        let mask = Bitmask::try_from(desc.mask)?;
        Ok(Operand::new(mask, desc.kind).with_tags(desc.tags.unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_and_encode_use_field_position() {
        let reg = Operand::register(0x0F00);
        assert_eq!(reg.decode(0x8AB4), 0xA);
        assert_eq!(reg.encode(0xA), 0x0A00);
        assert_eq!(reg.encode(0x1A), 0x0A00, "bits beyond the field are dropped");
    }

    #[test]
    fn tag_builders_accumulate_flags() {
        let operand = Operand::register(0x0F00).destination().indirect();
        assert!(operand.is_destination());
        assert!(operand.is_indirect());
        assert_eq!(
            operand.tags().flags,
            OperandFlags::DESTINATION | OperandFlags::INDIRECT
        );
        assert!(!Operand::constant(0x00FF).is_destination());
    }

    #[test]
    fn exact_tag_restricts_accepted_values() {
        let operand = Operand::constant(0x000F).exact(0x4);
        assert!(operand.accepts(0x4));
        assert!(!operand.accepts(0x5));
        assert!(Operand::constant(0x000F).accepts(0x5));
    }

    #[test]
    fn descriptor_conversion_validates_mask_range() {
        let desc = OperandDescriptor {
            mask: 0x0FFF,
            kind: OperandKind::RomAddress,
            tags: Some(OperandTags::new(OperandFlags::INDIRECT)),
        };
        let operand = Operand::try_from(desc).expect("valid descriptor");
        assert_eq!(operand.mask().mask(), 0x0FFF);
        assert!(operand.kind().is_address());
        assert!(operand.is_indirect());

        let wide = OperandDescriptor::new(0x1_0000, OperandKind::Constant);
        assert_eq!(
            Operand::try_from(wide),
            Err(IsaError::MaskOutOfRange { value: 0x1_0000 })
        );
    }
}
