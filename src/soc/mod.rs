//! Emulator core building blocks: ISA definitions, decode dispatch, and reference
//! architectures.

pub mod arch;
pub mod core;
pub mod isa;
