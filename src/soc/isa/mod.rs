//! Instruction-set definition, decode dispatch, and semantics compilation.
//!
//! The pipeline is leaf to root: fixed-width [`word`] arithmetic, [`bitmask`] field algebra,
//! [`operand`] and [`operation`] specifications, the [`machine`] dispatch table plus decode
//! cache, and the [`semantics`] compiler that turns per-operation programs into closures.

pub mod bitmask;
pub mod error;
pub mod machine;
pub mod operand;
pub mod operation;
pub mod semantics;
pub mod word;

pub use bitmask::{Bitmask, MaskBits, MaskItem};
pub use error::IsaError;
pub use machine::{DecodedInstruction, Disassembly, InstructionCache, InstructionSet, OperationSource};
pub use operand::{Operand, OperandDescriptor, OperandFlags, OperandKind, OperandTags};
pub use operation::{OperandValues, Operation, OperationBuilder, OperationDescriptor};
pub use word::{ArithFlag, Wrapped};
