//! Property-based checks of the mask algebra, decode dispatch, and compiled arithmetic.

use chipisa::soc::arch::chip8;
use chipisa::soc::isa::semantics::fragment::{CONTEXT, OPERANDS, assign, call, lib, reference};
use chipisa::soc::isa::semantics::{MapContext, Program, Value, compile, fixed_width_library};
use chipisa::soc::isa::word::{w8, w16};
use chipisa::soc::isa::{Bitmask, Operand, Operation};
use proptest::prelude::*;

fn chip8_operations() -> Vec<Operation> {
    chip8::operations().expect("chip-8 table")
}

proptest! {
    /// Property: decode(encode(v)) == v for every value that fits the field
    #[test]
    fn prop_operand_round_trip(mask in 1u16..=u16::MAX, raw in any::<u16>()) {
        let operand = Operand::constant(mask);
        let value = raw & operand.mask().vmask();
        prop_assert_eq!(operand.decode(operand.encode(value)), value);
    }

    /// Property: emplace then extract returns the value and leaves other bits alone
    #[test]
    fn prop_emplace_extract(mask in 1u16..=u16::MAX, raw in any::<u16>(), word in any::<u16>()) {
        let field = Bitmask::new(mask);
        let value = raw & field.vmask();
        let placed = field.emplace(value, word).expect("value fits");
        prop_assert_eq!(field.extract(placed), value);
        prop_assert_eq!(placed & !mask, word & !mask);
        prop_assert_eq!(field.emplace(0, word).expect("zero fits") & mask, 0);
    }

    /// Property: values wider than the field are rejected by the checked emplace
    #[test]
    fn prop_emplace_rejects_overflow(mask in 1u16..=0x7FFF, word in any::<u16>()) {
        let field = Bitmask::new(mask);
        let too_wide = field.vmask().wrapping_add(1);
        prop_assume!(too_wide & !field.vmask() != 0);
        prop_assert!(field.emplace(too_wide, word).is_err());
    }

    /// Property: bit reversal is an involution
    #[test]
    fn prop_bitrev_involution(a in any::<u16>(), b in any::<u8>()) {
        prop_assert_eq!(w16::bitrev(w16::bitrev(a)), a);
        prop_assert_eq!(w8::bitrev(w8::bitrev(b)), b);
    }

    /// Property: a word built from an operation's opcode always decodes and re-encodes to itself
    #[test]
    fn prop_operation_round_trip(
        operation in prop::sample::select(chip8_operations()),
        noise in any::<u16>(),
    ) {
        let word = operation.opcode() | (noise & !operation.mask().mask());
        prop_assert!(operation.matches(word));
        let operands = operation.decode(word);
        prop_assert_eq!(operation.encode(&operands).expect("operands fit"), word);
    }

    /// Property: lookup returns the most specific matching operation, or nothing when none match
    #[test]
    fn prop_lookup_prefers_specificity(word in any::<u16>()) {
        let set = chip8::instruction_set().expect("chip-8 table");
        let best = set
            .operations()
            .iter()
            .filter(|op| op.matches(word))
            .map(|op| op.specificity())
            .max();
        let found = set.lookup(word);
        prop_assert_eq!(found.map(|op| op.specificity()), best);
        if let Some(op) = found {
            prop_assert!(op.matches(word));
        }
    }

    /// Property: compiled calls into the host library agree with the word helpers
    #[test]
    fn prop_compiled_add16_matches_word_add(a in any::<u16>(), b in any::<u16>()) {
        let program = Program::new("add16")
            .with_lib(fixed_width_library())
            .instruction(assign(
                &reference(CONTEXT, ["sum"]),
                &call(&lib("add16"), [reference(OPERANDS, ["0"]), reference(OPERANDS, ["1"])]),
            ))
            .instruction(assign(
                &reference(CONTEXT, ["carry"]),
                &call(&lib("carry16"), [reference(OPERANDS, ["0"]), reference(OPERANDS, ["1"])]),
            ));
        let compiled = compile(&program).expect("compiles");
        let mut ctx = MapContext::new();
        compiled
            .call(&mut ctx, &mut [Value::from(a), Value::from(b)])
            .expect("runs");

        let expected = w16::add(a, b);
        prop_assert_eq!(ctx.int("sum"), Some(i64::from(expected.value)));
        prop_assert_eq!(ctx.int("carry"), Some(i64::from(expected.flag.is_overflow())));
    }
}
