//! Field masks over 16-bit instruction words.

use std::fmt;

use super::error::IsaError;
use super::word::w16;

/// Immutable description of a (possibly non-contiguous) bit field inside an instruction word.
///
/// `width` is the span from the lowest to the highest set bit, not the number of set bits:
/// `0b1000_0000_0100_0010` spans bits 1..=15 and therefore reports a width of 15.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Bitmask {
    mask: u16,
    lsb: u32,
    msb: u32,
    width: u32,
    vmask: u16,
}

impl Bitmask {
    pub fn new(mask: u16) -> Self {
        let lsb = w16::bitscanf(mask);
        let msb = w16::bitscanr(mask);
        let width = if mask == 0 { 0 } else { msb - lsb + 1 };
        Self {
            mask,
            lsb,
            msb,
            width,
            vmask: mask >> lsb,
        }
    }

    pub fn mask(&self) -> u16 {
        self.mask
    }

    pub fn lsb(&self) -> u32 {
        self.lsb
    }

    pub fn msb(&self) -> u32 {
        self.msb
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Validity mask for right-aligned field values.
    pub fn vmask(&self) -> u16 {
        self.vmask
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    /// Pulls the masked field out of `word` and right-aligns it.
    pub fn extract(&self, word: u16) -> u16 {
        if self.mask == 0 {
            return 0;
        }
        (word & self.mask) >> self.lsb
    }

    /// Shifts a right-aligned `value` into the field, replacing whatever `word` held there.
    pub fn emplace(&self, value: u16, word: u16) -> Result<u16, IsaError> {
        if value & !self.vmask != 0 {
            return Err(IsaError::FieldOverflow {
                value,
                mask: self.mask,
            });
        }
        Ok(self.emplace_masked(value, word))
    }

    /// Like [`Bitmask::emplace`] but silently drops value bits outside the field.
    pub fn emplace_masked(&self, value: u16, word: u16) -> u16 {
        (word & !self.mask) | ((value & self.vmask) << self.lsb)
    }

    /// True when any bit of `other` is also part of this mask.
    pub fn overlaps<T: MaskBits + ?Sized>(&self, other: &T) -> bool {
        self.mask & other.mask_bits() != 0
    }
}

impl From<u16> for Bitmask {
    fn from(mask: u16) -> Self {
        Bitmask::new(mask)
    }
}

impl TryFrom<u32> for Bitmask {
    type Error = IsaError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        u16::try_from(value)
            .map(Bitmask::new)
            .map_err(|_| IsaError::MaskOutOfRange {
                value: value as i64,
            })
    }
}

impl TryFrom<i64> for Bitmask {
    type Error = IsaError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u16::try_from(value)
            .map(Bitmask::new)
            .map_err(|_| IsaError::MaskOutOfRange { value })
    }
}

impl fmt::Display for Bitmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.mask)
    }
}

/// Either a raw mask or a [`Bitmask`], for heterogeneous overlap queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskItem {
    Raw(u16),
    Mask(Bitmask),
}

impl From<u16> for MaskItem {
    fn from(value: u16) -> Self {
        MaskItem::Raw(value)
    }
}

impl From<Bitmask> for MaskItem {
    fn from(value: Bitmask) -> Self {
        MaskItem::Mask(value)
    }
}

/// Anything that can be collapsed into the union of the bits it covers.
pub trait MaskBits {
    fn mask_bits(&self) -> u16;
}

impl MaskBits for u16 {
    fn mask_bits(&self) -> u16 {
        *self
    }
}

impl MaskBits for Bitmask {
    fn mask_bits(&self) -> u16 {
        self.mask
    }
}

impl MaskBits for MaskItem {
    fn mask_bits(&self) -> u16 {
        match self {
            MaskItem::Raw(bits) => *bits,
            MaskItem::Mask(mask) => mask.mask,
        }
    }
}

impl<T: MaskBits> MaskBits for [T] {
    fn mask_bits(&self) -> u16 {
        self.iter().fold(0, |acc, item| acc | item.mask_bits())
    }
}

impl<T: MaskBits, const N: usize> MaskBits for [T; N] {
    fn mask_bits(&self) -> u16 {
        self.as_slice().mask_bits()
    }
}

impl<T: MaskBits> MaskBits for Vec<T> {
    fn mask_bits(&self) -> u16 {
        self.as_slice().mask_bits()
    }
}

impl<T: MaskBits + ?Sized> MaskBits for &T {
    fn mask_bits(&self) -> u16 {
        (**self).mask_bits()
    }
}
