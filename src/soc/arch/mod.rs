//! Concrete instruction sets built on the ISA engine.

pub mod chip8;
