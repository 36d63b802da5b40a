//! Named instruction specifications: mnemonic, fixed opcode bits, and ordered operands.

use std::fmt;

use smallvec::SmallVec;

use super::bitmask::Bitmask;
use super::error::IsaError;
use super::operand::{Operand, OperandDescriptor};
use super::word::w16;

pub type OperandValues = SmallVec<[u16; 4]>;

/// A validated instruction specification.
///
/// The operation's own mask is every bit *not* claimed by an operand; `opcode` gives the
/// required value of those bits. Operand masks must be pairwise disjoint, which is what makes
/// the XOR-fold used to derive the mask equal to the complement of the operand union.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Operation {
    mnemonic: String,
    opcode: u16,
    operands: SmallVec<[Operand; 4]>,
    mask: Bitmask,
}

impl Operation {
    /// Positional constructor.
    pub fn new(
        mnemonic: impl Into<String>,
        opcode: u16,
        operands: impl IntoIterator<Item = Operand>,
    ) -> Result<Self, IsaError> {
        let mnemonic = mnemonic.into();
        if mnemonic.is_empty() || !mnemonic.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(IsaError::InvalidMnemonic { mnemonic });
        }
        let operands: SmallVec<[Operand; 4]> = operands.into_iter().collect();

        // the XOR-fold below is the complement of the operand union only for disjoint operands
        let overlap = shared_bits(&operands);
        if overlap != 0 {
            return Err(IsaError::OverlappingOperands { overlap, mnemonic });
        }
        let folded = operands
            .iter()
            .fold(w16::MAX, |acc, op| acc ^ op.mask().mask());
        if folded == 0 {
            return Err(IsaError::OperandsConsumeAllBits { mnemonic });
        }
        let stray = opcode & !folded;
        if stray != 0 {
            return Err(IsaError::OpcodeCollision {
                mnemonic,
                opcode,
                bits: stray,
            });
        }

        Ok(Self {
            mnemonic,
            opcode,
            operands,
            mask: Bitmask::new(folded),
        })
    }

    /// Options-record constructor.
    pub fn from_descriptor(desc: OperationDescriptor) -> Result<Self, IsaError> {
        let operands = desc
            .operands
            .into_iter()
            .map(Operand::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(desc.mnemonic, desc.opcode, operands)
    }

    pub fn builder(mnemonic: impl Into<String>) -> OperationBuilder {
        OperationBuilder::new(mnemonic)
    }

    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    pub fn opcode(&self) -> u16 {
        self.opcode
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub fn mask(&self) -> &Bitmask {
        &self.mask
    }

    /// Number of bits spanned by the fixed portion of the encoding; higher is more specific.
    pub fn specificity(&self) -> u32 {
        self.mask.width()
    }

    pub fn matches(&self, word: u16) -> bool {
        word & self.mask.mask() == self.opcode
    }

    /// Splits `word` into operand values, in declaration order.
    pub fn decode(&self, word: u16) -> OperandValues {
        self.operands.iter().map(|op| op.decode(word)).collect()
    }

    /// Folds operand values back into an instruction word, starting from the opcode.
    pub fn encode(&self, values: &[u16]) -> Result<u16, IsaError> {
        if values.len() != self.operands.len() {
            return Err(IsaError::OperandCount {
                mnemonic: self.mnemonic.clone(),
                expected: self.operands.len(),
                actual: values.len(),
            });
        }
        Ok(self
            .operands
            .iter()
            .zip(values)
            .fold(self.opcode, |word, (op, value)| {
                op.mask().emplace_masked(*value, word)
            }))
    }

    /// Verifies operand values against `exact` tags without encoding them.
    pub fn check_operands(&self, values: &[u16]) -> Result<(), IsaError> {
        for (index, (op, value)) in self.operands.iter().zip(values).enumerate() {
            if let Some(expected) = op.tags().exact
                && !op.accepts(*value)
            {
                return Err(IsaError::ExactOperandMismatch {
                    mnemonic: self.mnemonic.clone(),
                    index,
                    expected,
                    actual: *value,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:#06x}/{}", self.mnemonic, self.opcode, self.mask)
    }
}

fn shared_bits(operands: &[Operand]) -> u16 {
    let mut seen = 0u16;
    let mut shared = 0u16;
    for op in operands {
        let bits = op.mask().mask();
        shared |= seen & bits;
        seen |= bits;
    }
    shared
}

/// Record form of an operation as supplied by an architecture definition table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub mnemonic: String,
    pub opcode: u16,
    pub operands: Vec<OperandDescriptor>,
}

impl OperationDescriptor {
    pub fn new(
        mnemonic: impl Into<String>,
        opcode: u16,
        operands: impl Into<Vec<OperandDescriptor>>,
    ) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            opcode,
            operands: operands.into(),
        }
    }
}

impl TryFrom<OperationDescriptor> for Operation {
    type Error = IsaError;

    fn try_from(desc: OperationDescriptor) -> Result<Self, Self::Error> {
        Operation::from_descriptor(desc)
    }
}

/// Fluent front end over [`Operation::new`].
pub struct OperationBuilder {
    mnemonic: String,
    opcode: u16,
    operands: SmallVec<[Operand; 4]>,
}

impl OperationBuilder {
    fn new(mnemonic: impl Into<String>) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            opcode: 0,
            operands: SmallVec::new(),
        }
    }

    pub fn opcode(mut self, opcode: u16) -> Self {
        self.opcode = opcode;
        self
    }

    pub fn operand(mut self, operand: Operand) -> Self {
        self.operands.push(operand);
        self
    }

    pub fn finish(self) -> Result<Operation, IsaError> {
        Operation::new(self.mnemonic, self.opcode, self.operands)
    }
}
