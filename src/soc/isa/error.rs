use std::fmt;

/// Invariant violations raised while assembling or using an instruction-set definition.
///
/// These are programmer errors in an ISA description. They surface at construction time
/// wherever possible so a malformed definition fails at startup instead of mid-decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IsaError {
    InvalidMnemonic {
        mnemonic: String,
    },
    MaskOutOfRange {
        value: i64,
    },
    FieldOverflow {
        value: u16,
        mask: u16,
    },
    OverlappingOperands {
        mnemonic: String,
        overlap: u16,
    },
    OperandsConsumeAllBits {
        mnemonic: String,
    },
    OpcodeCollision {
        mnemonic: String,
        opcode: u16,
        bits: u16,
    },
    OperandCount {
        mnemonic: String,
        expected: usize,
        actual: usize,
    },
    ExactOperandMismatch {
        mnemonic: String,
        index: usize,
        expected: u16,
        actual: u16,
    },
}

impl fmt::Display for IsaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsaError::InvalidMnemonic { mnemonic } => {
                write!(f, "mnemonic '{mnemonic}' must consist of uppercase letters only")
            }
            IsaError::MaskOutOfRange { value } => {
                write!(f, "mask {value:#x} exceeds the 16-bit instruction word")
            }
            IsaError::FieldOverflow { value, mask } => write!(
                f,
                "value {value:#x} does not fit the field described by mask {mask:#06x}"
            ),
            IsaError::OverlappingOperands { mnemonic, overlap } => write!(
                f,
                "operation '{mnemonic}' declares operands sharing bits {overlap:#06x}"
            ),
            IsaError::OperandsConsumeAllBits { mnemonic } => write!(
                f,
                "operation '{mnemonic}' has no fixed bits left after its operands"
            ),
            IsaError::OpcodeCollision {
                mnemonic,
                opcode,
                bits,
            } => write!(
                f,
                "opcode {opcode:#06x} of '{mnemonic}' sets operand bits {bits:#06x}"
            ),
            IsaError::OperandCount {
                mnemonic,
                expected,
                actual,
            } => write!(
                f,
                "operation '{mnemonic}' expects {expected} operand value(s), got {actual}"
            ),
            IsaError::ExactOperandMismatch {
                mnemonic,
                index,
                expected,
                actual,
            } => write!(
                f,
                "operand {index} of '{mnemonic}' must equal {expected:#x}, got {actual:#x}"
            ),
        }
    }
}

impl std::error::Error for IsaError {}
