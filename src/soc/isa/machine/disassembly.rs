//! Decoded instruction records and listing helpers built on top of [`InstructionSet`].

use std::fmt;
use std::sync::Arc;

use crate::soc::isa::operand::{Operand, OperandKind};
use crate::soc::isa::operation::{OperandValues, Operation};

use super::InstructionSet;

/// A raw word paired with the operation it resolved to and its operand values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub word: u16,
    pub operation: Arc<Operation>,
    pub operands: OperandValues,
}

impl DecodedInstruction {
    pub fn new(word: u16, operation: Arc<Operation>) -> Self {
        let operands = operation.decode(word);
        Self {
            word,
            operation,
            operands,
        }
    }

    pub fn mnemonic(&self) -> &str {
        self.operation.mnemonic()
    }

    pub fn operand_strings(&self) -> Vec<String> {
        self.operation
            .operands()
            .iter()
            .zip(&self.operands)
            .map(|(operand, value)| format_operand(operand, *value))
            .collect()
    }
}

impl fmt::Display for DecodedInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())?;
        for (idx, operand) in self.operand_strings().iter().enumerate() {
            let sep = if idx == 0 { " " } else { ", " };
            write!(f, "{sep}{operand}")?;
        }
        Ok(())
    }
}

fn format_operand(operand: &Operand, value: u16) -> String {
    let text = match operand.kind() {
        OperandKind::Register => format!("V{value:X}"),
        OperandKind::Constant => format!("{value:#04X}"),
        OperandKind::RomAddress | OperandKind::RamAddress => format!("{value:#05X}"),
    };
    if operand.is_indirect() {
        format!("[{text}]")
    } else {
        text
    }
}

/// One row of a listing produced by [`InstructionSet::disassemble_from`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disassembly {
    pub address: u64,
    pub word: u16,
    pub mnemonic: String,
    pub operands: Vec<String>,
}

impl fmt::Display for Disassembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{addr:04X}: {word:04X}  {mnemonic:<5} {operands}",
            addr = self.address,
            word = self.word,
            mnemonic = self.mnemonic,
            operands = self.operands.join(", ")
        )
    }
}

impl InstructionSet {
    pub fn disassemble(&self, bytes: &[u8]) -> Vec<Disassembly> {
        self.disassemble_from(bytes, 0)
    }

    /// Walks a big-endian stream of 16-bit words. A trailing odd byte is ignored.
    pub fn disassemble_from(&self, bytes: &[u8], base_address: u64) -> Vec<Disassembly> {
        bytes
            .chunks_exact(2)
            .enumerate()
            .map(|(idx, chunk)| {
                let word = u16::from_be_bytes([chunk[0], chunk[1]]);
                let address = base_address + (idx as u64) * 2;
                match self.decode(word) {
                    Some(decoded) => Disassembly {
                        address,
                        word,
                        mnemonic: decoded.mnemonic().to_string(),
                        operands: decoded.operand_strings(),
                    },
                    None => Disassembly {
                        address,
                        word,
                        mnemonic: "unknown".into(),
                        operands: vec![format!("{word:#06X}")],
                    },
                }
            })
            .collect()
    }
}
