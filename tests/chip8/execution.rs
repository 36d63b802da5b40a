use std::sync::Arc;

use hex_literal::hex;

use chipisa::soc::arch::chip8;
use chipisa::soc::core::{Dispatcher, Step};
use chipisa::soc::isa::semantics::{MapContext, Value};

fn dispatcher() -> Dispatcher {
    let set = Arc::new(chip8::instruction_set().expect("chip-8 table"));
    Dispatcher::new(set, chip8::semantics).expect("chip-8 semantics compile")
}

/// Fetch/advance/execute loop over a ROM loaded at the program start address.
fn run(dispatcher: &mut Dispatcher, rom: &[u8], ctx: &mut MapContext, max_steps: usize) -> Vec<Step> {
    let mut steps = Vec::new();
    for _ in 0..max_steps {
        let pc = ctx.int("pc").expect("pc is an int");
        let offset = (pc - i64::from(chip8::PROGRAM_START)) as usize;
        let Some(bytes) = rom.get(offset..offset + 2) else {
            break;
        };
        ctx.set("pc", pc + 2);
        let word = u16::from_be_bytes([bytes[0], bytes[1]]);
        steps.push(dispatcher.execute(word, ctx).expect("instruction executes"));
    }
    steps
}

fn mnemonics(steps: &[Step]) -> Vec<&str> {
    steps
        .iter()
        .map(|step| match step {
            Step::Executed { mnemonic, .. } | Step::Unimplemented { mnemonic, .. } => mnemonic.as_str(),
            Step::Illegal { .. } => "<illegal>",
        })
        .collect()
}

fn register(ctx: &MapContext, index: usize) -> i64 {
    ctx.element("V", index)
        .and_then(|value| value.as_int().ok())
        .expect("register holds an int")
}

#[test]
fn runs_subroutine_and_skip() {
    let mut dispatcher = dispatcher();
    let mut ctx = chip8::context();
    let rom = hex!("60FF 6102 8014 220E 3005 00E0 120C 7004 00EE");

    let steps = run(&mut dispatcher, &rom, &mut ctx, 9);
    assert_eq!(
        mnemonics(&steps),
        vec!["LD", "LD", "ADD", "CALL", "ADD", "RET", "SE", "JP", "JP"],
        "CLS is skipped once V0 reaches 5"
    );
    assert_eq!(register(&ctx, 0), 5);
    assert_eq!(register(&ctx, 1), 2);
    assert_eq!(register(&ctx, 0xF), 1, "0xFF + 0x02 carries");
    assert_eq!(ctx.int("pc"), Some(0x20C));
    assert_eq!(ctx.int("sp"), Some(0));
    assert_eq!(ctx.element("stack", 0), Some(&Value::Int(0x208)));
}

#[test]
fn alu_ops_set_vf_from_original_operands() {
    let mut dispatcher = dispatcher();
    let mut ctx = chip8::context();
    let rom = hex!("6010 6120 8015 6281 820E 6305 8316 6410 6530 8457");
    run(&mut dispatcher, &rom, &mut ctx, 10);

    assert_eq!(register(&ctx, 0), 0xF0, "0x10 - 0x20 wraps");
    assert_eq!(register(&ctx, 2), 0x02, "0x81 << 1 drops the top bit");
    assert_eq!(register(&ctx, 3), 0x02, "0x05 >> 1");
    assert_eq!(register(&ctx, 4), 0x20, "SUBN computes Vy - Vx");
    assert_eq!(register(&ctx, 0xF), 1, "no borrow in the final SUBN");
}

#[test]
fn skip_instructions_compare_registers() {
    let mut dispatcher = dispatcher();
    let mut ctx = chip8::context();
    // SE V0, V1 skips the next load; SNE V0, 0x07 does not skip.
    let rom = hex!("6007 6107 5010 6AAA 4007 6BBB");
    let steps = run(&mut dispatcher, &rom, &mut ctx, 5);
    assert_eq!(mnemonics(&steps), vec!["LD", "LD", "SE", "SNE", "LD"]);
    assert_eq!(register(&ctx, 0xA), 0, "skipped load never ran");
    assert_eq!(register(&ctx, 0xB), 0xBB);
}

#[test]
fn index_register_and_timers() {
    let mut dispatcher = dispatcher();
    let mut ctx = chip8::context();
    let rom = hex!("A300 6504 F51E F529 6633 F615 F707 F618");
    run(&mut dispatcher, &rom, &mut ctx, 8);
    assert_eq!(ctx.int("I"), Some(20), "font glyph for digit 4");
    assert_eq!(ctx.int("DT"), Some(0x33));
    assert_eq!(ctx.int("ST"), Some(0x33));
    assert_eq!(register(&ctx, 7), 0x33);
}

#[test]
fn jump_with_offset_and_random_mask() {
    let mut dispatcher = dispatcher();
    let mut ctx = chip8::context();
    let rom = hex!("6004 B200");
    run(&mut dispatcher, &rom, &mut ctx, 2);
    assert_eq!(ctx.int("pc"), Some(0x204));

    let step = dispatcher.execute(0xC30F, &mut ctx).expect("RND executes");
    assert!(matches!(step, Step::Executed { .. }));
    assert!(register(&ctx, 3) <= 0x0F, "RND is masked by kk");
}

#[test]
fn unsupported_words_are_reported_not_executed() {
    let mut dispatcher = dispatcher();
    let mut ctx = chip8::context();
    assert_eq!(
        dispatcher.execute(0xD015, &mut ctx).expect("soft result"),
        Step::Unimplemented {
            word: 0xD015,
            mnemonic: "DRW".into()
        }
    );
    assert_eq!(
        dispatcher.execute(0x8AB8, &mut ctx).expect("soft result"),
        Step::Illegal { word: 0x8AB8 }
    );
}

#[test]
fn returning_with_an_empty_stack_fails() {
    let mut dispatcher = dispatcher();
    let mut ctx = chip8::context();
    let err = dispatcher.execute(0x00EE, &mut ctx).expect_err("stack underflow");
    assert!(err.to_string().contains("0x00EE"), "got {err}");
}

#[test]
fn cache_holds_each_distinct_word_once() {
    let mut dispatcher = dispatcher();
    let mut ctx = chip8::context();
    let rom = hex!("1200");
    run(&mut dispatcher, &rom, &mut ctx, 16);
    assert_eq!(dispatcher.cache().len(), 1, "the tight loop decodes once");
}
