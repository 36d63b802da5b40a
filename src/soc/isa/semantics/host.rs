//! Library exposing the fixed-width word helpers to semantic programs.
//!
//! Entries are suffixed with their width: `add8`, `carry16`, `rotl8`, ... Word arguments must
//! already fit the width; anything else is an [`ExecError::Argument`]. Only `wrap8`/`wrap16`
//! accept arbitrary integers.

use crate::soc::isa::word::{w8, w16};

use super::error::ExecError;
use super::runtime::Library;
use super::value::Value;

fn argument(function: &str, args: &[Value], index: usize) -> Result<i64, ExecError> {
    let value = args.get(index).ok_or_else(|| ExecError::Argument {
        function: function.to_string(),
        message: format!("expected at least {} argument(s), got {}", index + 1, args.len()),
    })?;
    value.as_int()
}

fn shift_count(function: &str, args: &[Value], index: usize) -> Result<u32, ExecError> {
    let count = argument(function, args, index)?;
    u32::try_from(count).map_err(|_| ExecError::Argument {
        function: function.to_string(),
        message: format!("shift count {count} must be non-negative"),
    })
}

macro_rules! width_library {
    ($register:ident, $module:ident, $word:ty, $suffix:literal) => {
        fn $register(lib: Library) -> Library {
            fn word(function: &str, args: &[Value], index: usize) -> Result<$word, ExecError> {
                let raw = argument(function, args, index)?;
                if $module::is_valid(raw) {
                    Ok(raw as $word)
                } else {
                    Err(ExecError::Argument {
                        function: function.to_string(),
                        message: format!(
                            "argument {index} ({raw}) does not fit {} bits",
                            $module::BITS
                        ),
                    })
                }
            }

            lib.function(concat!("wrap", $suffix), |_, args| {
                let raw = argument(concat!("wrap", $suffix), args, 0)?;
                Ok(Value::from($module::cast(raw)))
            })
            .function(concat!("add", $suffix), |_, args| {
                let name = concat!("add", $suffix);
                let sum = $module::add(word(name, args, 0)?, word(name, args, 1)?);
                Ok(Value::from(sum.value))
            })
            .function(concat!("sub", $suffix), |_, args| {
                let name = concat!("sub", $suffix);
                let diff = $module::sub(word(name, args, 0)?, word(name, args, 1)?);
                Ok(Value::from(diff.value))
            })
            .function(concat!("carry", $suffix), |_, args| {
                let name = concat!("carry", $suffix);
                let sum = $module::add(word(name, args, 0)?, word(name, args, 1)?);
                Ok(Value::Int(i64::from(sum.flag.is_overflow())))
            })
            .function(concat!("borrow", $suffix), |_, args| {
                let name = concat!("borrow", $suffix);
                let diff = $module::sub(word(name, args, 0)?, word(name, args, 1)?);
                Ok(Value::Int(i64::from(diff.flag.is_overflow())))
            })
            .function(concat!("shl", $suffix), |_, args| {
                let name = concat!("shl", $suffix);
                let shifted = $module::bitshiftl(word(name, args, 0)?, shift_count(name, args, 1)?);
                Ok(Value::from(shifted))
            })
            .function(concat!("shr", $suffix), |_, args| {
                let name = concat!("shr", $suffix);
                let shifted = $module::bitshiftr(word(name, args, 0)?, shift_count(name, args, 1)?);
                Ok(Value::from(shifted))
            })
            .function(concat!("rotl", $suffix), |_, args| {
                let name = concat!("rotl", $suffix);
                let rotated = $module::bitshiftlw(word(name, args, 0)?, shift_count(name, args, 1)?);
                Ok(Value::from(rotated))
            })
            .function(concat!("rotr", $suffix), |_, args| {
                let name = concat!("rotr", $suffix);
                let rotated = $module::bitshiftrw(word(name, args, 0)?, shift_count(name, args, 1)?);
                Ok(Value::from(rotated))
            })
            .function(concat!("bitrev", $suffix), |_, args| {
                let reversed = $module::bitrev(word(concat!("bitrev", $suffix), args, 0)?);
                Ok(Value::from(reversed))
            })
            .function(concat!("bitscanf", $suffix), |_, args| {
                let index = $module::bitscanf(word(concat!("bitscanf", $suffix), args, 0)?);
                Ok(Value::Int(i64::from(index)))
            })
            .function(concat!("bitscanr", $suffix), |_, args| {
                let index = $module::bitscanr(word(concat!("bitscanr", $suffix), args, 0)?);
                Ok(Value::Int(i64::from(index)))
            })
        }
    };
}

width_library!(register_w8, w8, u8, "8");
width_library!(register_w16, w16, u16, "16");

/// Every fixed-width helper for both word sizes.
pub fn fixed_width_library() -> Library {
    register_w16(register_w8(Library::new()))
}
