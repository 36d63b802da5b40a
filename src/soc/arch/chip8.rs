//! CHIP-8 instruction table and semantics for its register, ALU, and control-flow subset.
//!
//! Semantics run against [`context`]: `V[16]`, `stack[16]`, `I`, `pc`, `sp`, `DT`, `ST`, and
//! the `seed` used by `RND`. The fetch stage is expected to advance `pc` past the instruction
//! before executing it, so skips add 2 and jumps overwrite `pc` outright.

use std::sync::Arc;

use crate::soc::isa::error::IsaError;
use crate::soc::isa::machine::InstructionSet;
use crate::soc::isa::operand::Operand;
use crate::soc::isa::operation::Operation;
use crate::soc::isa::semantics::fragment::{
    CONTEXT, OPERANDS, assign, call, con, lib, reference, subscript,
};
use crate::soc::isa::semantics::{Key, Library, MapContext, Program, Value, fixed_width_library};
use crate::soc::isa::word::w16;

pub const PROGRAM_START: u16 = 0x200;
pub const FONT_GLYPH_BYTES: i64 = 5;

fn vx() -> Operand {
    Operand::register(0x0F00)
}

fn vy() -> Operand {
    Operand::register(0x00F0)
}

fn byte() -> Operand {
    Operand::constant(0x00FF)
}

fn addr() -> Operand {
    Operand::rom_address(0x0FFF)
}

/// The 35 standard CHIP-8 operations, in the order of the reference opcode table.
pub fn operations() -> Result<Vec<Operation>, IsaError> {
    Ok(vec![
        Operation::new("SYS", 0x0000, [addr()])?,
        Operation::new("CLS", 0x00E0, [])?,
        Operation::new("RET", 0x00EE, [])?,
        Operation::new("JP", 0x1000, [addr()])?,
        Operation::new("CALL", 0x2000, [addr()])?,
        Operation::new("SE", 0x3000, [vx(), byte()])?,
        Operation::new("SNE", 0x4000, [vx(), byte()])?,
        Operation::new("SE", 0x5000, [vx(), vy()])?,
        Operation::new("LD", 0x6000, [vx().destination(), byte()])?,
        Operation::new("ADD", 0x7000, [vx().destination(), byte()])?,
        Operation::new("LD", 0x8000, [vx().destination(), vy()])?,
        Operation::new("OR", 0x8001, [vx().destination(), vy()])?,
        Operation::new("AND", 0x8002, [vx().destination(), vy()])?,
        Operation::new("XOR", 0x8003, [vx().destination(), vy()])?,
        Operation::new("ADD", 0x8004, [vx().destination(), vy()])?,
        Operation::new("SUB", 0x8005, [vx().destination(), vy()])?,
        Operation::new("SHR", 0x8006, [vx().destination(), vy()])?,
        Operation::new("SUBN", 0x8007, [vx().destination(), vy()])?,
        Operation::new("SHL", 0x800E, [vx().destination(), vy()])?,
        Operation::new("SNE", 0x9000, [vx(), vy()])?,
        Operation::new("LD", 0xA000, [Operand::ram_address(0x0FFF)])?,
        Operation::new("JP", 0xB000, [addr()])?,
        Operation::new("RND", 0xC000, [vx().destination(), byte()])?,
        Operation::new("DRW", 0xD000, [vx(), vy(), Operand::constant(0x000F)])?,
        Operation::new("SKP", 0xE09E, [vx()])?,
        Operation::new("SKNP", 0xE0A1, [vx()])?,
        Operation::new("LD", 0xF007, [vx().destination()])?,
        Operation::new("LD", 0xF00A, [vx().destination()])?,
        Operation::new("LD", 0xF015, [vx()])?,
        Operation::new("LD", 0xF018, [vx()])?,
        Operation::new("ADD", 0xF01E, [vx()])?,
        Operation::new("LD", 0xF029, [vx()])?,
        Operation::new("LD", 0xF033, [vx()])?,
        Operation::new("LD", 0xF055, [vx()])?,
        Operation::new("LD", 0xF065, [vx().destination()])?,
    ])
}

pub fn instruction_set() -> Result<InstructionSet, IsaError> {
    InstructionSet::new(operations()?)
}

/// Fresh machine state with `pc` at [`PROGRAM_START`].
pub fn context() -> MapContext {
    MapContext::new()
        .with_array("V", 16)
        .with_array("stack", 16)
        .with_scalar("I", 0i64)
        .with_scalar("pc", PROGRAM_START)
        .with_scalar("sp", 0i64)
        .with_scalar("DT", 0i64)
        .with_scalar("ST", 0i64)
        .with_scalar("seed", 0xACE1u16)
}

/// Fixed-width helpers plus `random`, a 16-bit xorshift stepping `ctx.seed`.
pub fn library() -> Library {
    fixed_width_library().function("random", |ctx, _| {
        let seed = [Key::Name(Arc::from("seed"))];
        let mut state = w16::cast(ctx.load(&seed)?.as_int()?);
        state ^= state << 7;
        state ^= state >> 9;
        state ^= state << 8;
        ctx.store(&seed, Value::from(state))?;
        Ok(Value::from(state & 0x00FF))
    })
}

fn ctx(name: &str) -> String {
    reference(CONTEXT, [name])
}

fn operand(index: u8) -> String {
    reference(OPERANDS, [index.to_string()])
}

fn register(index: &str) -> String {
    subscript(&ctx("V"), index)
}

fn x() -> String {
    register(&operand(0))
}

fn y() -> String {
    register(&operand(1))
}

fn vf() -> String {
    reference(CONTEXT, ["V", "15"])
}

fn skip_if(condition: &str) -> String {
    let advance = assign(&ctx("pc"), &call(&lib("add16"), [ctx("pc"), con(2)]));
    format!("if ({condition}) {{ {advance} }}")
}

/// ALU op that computes the VF flag from the original operands before writing `Vx`.
fn flagged(flag: String, result: String) -> Vec<String> {
    vec![assign("flag", &flag), assign(&x(), &result), assign(&vf(), "flag")]
}

/// Semantics for `operation`, or `None` for operations needing display, keypad, or memory.
pub fn semantics(operation: &Operation) -> Option<Program> {
    let body = match operation.opcode() {
        0x00EE => vec![
            assign(&ctx("sp"), &format!("{} - 1", ctx("sp"))),
            assign(&ctx("pc"), &subscript(&ctx("stack"), &ctx("sp"))),
        ],
        0x1000 => vec![assign(&ctx("pc"), &operand(0))],
        0x2000 => vec![
            assign(&subscript(&ctx("stack"), &ctx("sp")), &ctx("pc")),
            assign(&ctx("sp"), &format!("{} + 1", ctx("sp"))),
            assign(&ctx("pc"), &operand(0)),
        ],
        0x3000 => vec![skip_if(&format!("{} == {}", x(), operand(1)))],
        0x4000 => vec![skip_if(&format!("{} != {}", x(), operand(1)))],
        0x5000 => vec![skip_if(&format!("{} == {}", x(), y()))],
        0x9000 => vec![skip_if(&format!("{} != {}", x(), y()))],
        0x6000 => vec![assign(&x(), &operand(1))],
        0x7000 => vec![assign(&x(), &call(&lib("add8"), [x(), operand(1)]))],
        0x8000 => vec![assign(&x(), &y())],
        0x8001 => vec![assign(&x(), &format!("{} | {}", x(), y()))],
        0x8002 => vec![assign(&x(), &format!("{} & {}", x(), y()))],
        0x8003 => vec![assign(&x(), &format!("{} ^ {}", x(), y()))],
        0x8004 => flagged(
            call(&lib("carry8"), [x(), y()]),
            call(&lib("add8"), [x(), y()]),
        ),
        0x8005 => flagged(
            format!("1 - {}", call(&lib("borrow8"), [x(), y()])),
            call(&lib("sub8"), [x(), y()]),
        ),
        0x8006 => flagged(
            format!("{} & 1", x()),
            call(&lib("shr8"), [x(), con(1)]),
        ),
        0x8007 => flagged(
            format!("1 - {}", call(&lib("borrow8"), [y(), x()])),
            call(&lib("sub8"), [y(), x()]),
        ),
        0x800E => flagged(
            call(&lib("shr8"), [x(), con(7)]),
            call(&lib("shl8"), [x(), con(1)]),
        ),
        0xA000 => vec![assign(&ctx("I"), &operand(0))],
        0xB000 => vec![assign(
            &ctx("pc"),
            &call(&lib("add16"), [operand(0), register(&con(0))]),
        )],
        0xC000 => vec![assign(
            &x(),
            &format!("{} & {}", call(&lib("random"), [] as [&str; 0]), operand(1)),
        )],
        0xF007 => vec![assign(&x(), &ctx("DT"))],
        0xF015 => vec![assign(&ctx("DT"), &x())],
        0xF018 => vec![assign(&ctx("ST"), &x())],
        0xF01E => vec![assign(&ctx("I"), &call(&lib("add16"), [ctx("I"), x()]))],
        0xF029 => vec![assign(&ctx("I"), &format!("{} * {}", x(), con(FONT_GLYPH_BYTES)))],
        _ => return None,
    };
    let name = format!("{} {:#06X}", operation.mnemonic(), operation.opcode());
    Some(
        Program::new(name)
            .local("flag")
            .with_lib(library())
            .instructions(body),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soc::isa::semantics::compile;

    #[test]
    fn table_has_every_standard_operation() {
        let operations = operations().expect("table is valid");
        assert_eq!(operations.len(), 35);
        let set = instruction_set().expect("set builds");
        assert_eq!(set.mask(), 0xF000, "dispatch keys on the high nibble");
    }

    #[test]
    fn exact_patterns_beat_sys() {
        let set = instruction_set().expect("set builds");
        let mnemonic = |word| set.lookup(word).map(|op| op.mnemonic().to_string());
        assert_eq!(mnemonic(0x00E0).as_deref(), Some("CLS"));
        assert_eq!(mnemonic(0x00EE).as_deref(), Some("RET"));
        assert_eq!(mnemonic(0x0123).as_deref(), Some("SYS"));
        assert_eq!(mnemonic(0x8AB6).as_deref(), Some("SHR"));
        assert_eq!(mnemonic(0x8AB8), None, "8xy8 is not a CHIP-8 opcode");
        assert_eq!(mnemonic(0xE19F), None);
    }

    #[test]
    fn every_semantics_program_compiles() {
        let operations = operations().expect("table is valid");
        let mut implemented = 0;
        for operation in &operations {
            if let Some(program) = semantics(operation) {
                compile(&program).unwrap_or_else(|err| panic!("{}: {err:?}", program.name));
                implemented += 1;
            }
        }
        assert_eq!(implemented, 26);
    }

    #[test]
    fn random_steps_the_seed() {
        let mut state = context();
        let program = Program::new("rnd")
            .with_lib(library())
            .instruction(assign(&ctx("a"), &call(&lib("random"), [] as [&str; 0])))
            .instruction(assign(&ctx("b"), &call(&lib("random"), [] as [&str; 0])));
        compile(&program)
            .expect("compiles")
            .call(&mut state, &mut [])
            .expect("runs");
        let a = state.int("a").expect("a set");
        let b = state.int("b").expect("b set");
        assert!((0..=0xFF).contains(&a) && (0..=0xFF).contains(&b));
        assert_ne!(state.int("seed"), Some(0xACE1), "seed advances");
    }
}
