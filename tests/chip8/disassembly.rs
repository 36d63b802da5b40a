use hex_literal::hex;

use chipisa::soc::arch::chip8;

#[test]
fn lists_a_chip8_rom() {
    let set = chip8::instruction_set().expect("chip-8 table");
    let rom = hex!("00E0 6A2F A123 D015 00EE 8AB8 1200");

    let listing = set.disassemble_from(&rom, u64::from(chip8::PROGRAM_START));
    let rendered: Vec<_> = listing
        .iter()
        .map(|row| format!("{} {}", row.mnemonic, row.operands.join(", ")))
        .collect();
    assert_eq!(
        rendered,
        vec![
            "CLS ",
            "LD VA, 0x2F",
            "LD 0x123",
            "DRW V0, V1, 0x05",
            "RET ",
            "unknown 0x8AB8",
            "JP 0x200",
        ]
    );
    assert_eq!(listing[1].address, 0x202);
    assert_eq!(listing[1].to_string(), "0x0202: 6A2F  LD    VA, 0x2F");
}

#[test]
fn decoded_instructions_encode_back_to_the_same_word() {
    let set = chip8::instruction_set().expect("chip-8 table");
    for word in hex!("00E0 00EE 0123 1ABC 2FFF 3A2F 5AB0 8AB4 8ABE 9AB0 B123 CA0F D015 EA9E FA65")
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
    {
        let decoded = set.decode(word).unwrap_or_else(|| panic!("{word:#06X} decodes"));
        let encoded = decoded
            .operation
            .encode(&decoded.operands)
            .expect("decoded operands fit their fields");
        assert_eq!(encoded, word, "{} did not round-trip", decoded);
    }
}

#[test]
fn mnemonic_search_finds_every_load_form() {
    let set = chip8::instruction_set().expect("chip-8 table");
    let forms: Vec<_> = set.find("LD").map(|op| op.opcode()).collect();
    assert_eq!(
        forms,
        vec![0x6000, 0x8000, 0xA000, 0xF007, 0xF00A, 0xF015, 0xF018, 0xF029, 0xF033, 0xF055, 0xF065]
    );
}
