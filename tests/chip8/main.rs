mod disassembly;
mod execution;
