//! Core-level execution: the decode/execute stage that ties an instruction set to its
//! compiled semantics.

pub mod dispatch;

pub use dispatch::{DispatchError, Dispatcher, ResolvedInstruction, Step};
