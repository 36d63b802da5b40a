//! Fixed-width instruction-set definition, decode dispatch, and semantics compilation for
//! 16-bit emulated CPUs.

pub mod soc;
