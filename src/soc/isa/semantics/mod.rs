//! Per-operation semantics compiled into native closures.
//!
//! A [`Program`] names its locals, the host [`Library`] it may call through `$name`, and a list
//! of instruction fragments. [`compile`] parses and resolves everything once; the returned
//! [`CompiledFn`] only touches the [`Context`] and operand slice it is handed.

pub mod compiler;
pub mod error;
pub mod fragment;
pub mod host;
pub mod lexer;
pub mod program;
pub mod runtime;
pub mod value;

pub use compiler::compile;
pub use error::{CompileError, ExecError, SynthesisError};
pub use host::fixed_width_library;
pub use program::Program;
pub use runtime::{CompiledFn, Context, HostFn, Key, LibEntry, Library, MapContext};
pub use value::Value;
