use super::*;
use crate::mips::config::MachineConfig;
use crate::mips::instruction::Instruction;
use crate::mips::memory::Bus;
use crate::mips::syscall::BufferedConsole;

fn errors_of(src: &str) -> (Program, Vec<AsmError>) {
    let mut errors = Vec::new();
    let prog = assemble_with(src, |e| errors.push(e));
    (prog, errors)
}

#[test]
fn la_expands_to_lui_ori_on_data_address() {
    let prog = assemble(".data\nmsg: .asciiz \"hi\"\n.text\nla $t0, msg").expect("assemble");
    assert_eq!(prog.text.len(), 2);
    assert_eq!(prog.text[0], encode(&Instruction::i(OPC_LUI, REG_AT, 0, 0x1001)));
    assert_eq!(prog.text[1], encode(&Instruction::i(OPC_ORI, 8, REG_AT, 0)));
}

#[test]
fn li_splits_into_upper_and_lower_halves() {
    let prog = assemble("li $t0, 70000").expect("assemble");
    assert_eq!(
        prog.text,
        vec![
            encode(&Instruction::i(OPC_LUI, REG_AT, 0, 0x1)),
            encode(&Instruction::i(OPC_ORI, 8, REG_AT, 0x1170)),
        ]
    );
}

#[test]
fn move_and_nop() {
    let prog = assemble("move $t0, $t1\nnop").expect("assemble");
    assert_eq!(prog.text[0], encode(&Instruction::r(FN_ADD, 8, 9, 0)));
    assert_eq!(prog.text[1], 0);
}

#[test]
fn forward_branch_uses_word_displacement() {
    let body = "\nadd $t2, $t2, $t2\nadd $t2, $t2, $t2\ndone: syscall";
    let by_label = assemble(&format!("beq $t0, $t1, done{body}")).expect("assemble");
    let by_number = assemble(&format!("beq $t0, $t1, 2{body}")).expect("assemble");
    assert_eq!(by_label.text, by_number.text);
    assert_eq!(by_label.text[0], encode(&Instruction::i(OPC_BEQ, 9, 8, 2)));
    assert_eq!(by_label.symbols["done"], Symbol::Text(12));
}

#[test]
fn pseudo_widths_count_toward_label_offsets() {
    let prog = assemble("blt $t0, $t1, end\nli $t2, 5\nend: nop").expect("assemble");
    assert_eq!(prog.text.len(), 5);
    assert_eq!(prog.symbols["end"], Symbol::Text(16));
    assert_eq!(prog.text[0], encode(&Instruction::r(FN_SLT, REG_AT, 8, 9)));
    assert_eq!(prog.text[1], encode(&Instruction::i(OPC_BNE, 0, REG_AT, 2)));
}

#[test]
fn backward_branch_is_negative() {
    let prog = assemble("loop: addi $t0, $t0, -1\nbne $t0, $zero, loop").expect("assemble");
    assert_eq!(prog.text[1], encode(&Instruction::i(OPC_BNE, 0, 8, (-2i16) as u16)));
}

#[test]
fn labels_can_share_a_line() {
    let prog = assemble("start: main: add $t0, $t0, $t0").expect("assemble");
    assert_eq!(prog.symbols["start"], Symbol::Text(0));
    assert_eq!(prog.symbols["main"], Symbol::Text(0));
    assert_eq!(prog.entry(), 0);
}

#[test]
fn entry_follows_main() {
    let prog = assemble("nop\nnop\nmain: nop").expect("assemble");
    assert_eq!(prog.entry(), 8);
}

#[test]
fn duplicate_label_is_reported() {
    let errs = assemble("x: nop\nx: nop").unwrap_err();
    assert_eq!(errs, vec![AsmError::new(1, "duplicate label: x")]);
    assert_eq!(errs[0].to_string(), "line 2: duplicate label: x");
}

#[test]
fn bad_register_is_replaced_by_zero() {
    let (prog, errs) = errors_of("add $t0, $bogus, $t1\nsyscall");
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].msg, "invalid register: $bogus");
    assert_eq!(prog.text.len(), 2);
    assert_eq!(prog.text[0], encode(&Instruction::r(FN_ADD, 8, 0, 9)));
}

#[test]
fn errors_do_not_stop_assembly() {
    let (prog, errs) = errors_of("frob $t0\nli $t0, zz\nend: addi $t0, $t0, 1\nbeq $t0, $t0, nowhere");
    assert_eq!(errs.len(), 3);
    assert_eq!(errs[0].msg, "unknown mnemonic: frob");
    assert_eq!(errs[1].line, 1);
    assert_eq!(errs[2].msg, "label not found: nowhere");
    // the failed li still reserves its two slots
    assert_eq!(prog.symbols["end"], Symbol::Text(12));
    assert_eq!(&prog.text[..3], &[0, 0, 0]);
    assert_eq!(prog.text[3], encode(&Instruction::i(OPC_ADDI, 8, 8, 1)));
    assert_eq!(prog.source_lines, vec![0, 1, 1, 2, 3]);
}

#[test]
fn data_layout_with_alignment() {
    let src = ".data\na: .byte 1\n.align 2\nb: .word a, 7\nc: .space 3\n.text\nnop";
    let prog = assemble(src).expect("assemble");
    assert_eq!(prog.symbols["b"], Symbol::Data(4));
    assert_eq!(prog.symbols["c"], Symbol::Data(12));
    assert_eq!(prog.data.len(), 3);
    assert_eq!(prog.data[0], DataBlock { name: Some("a".into()), offset: 0, bytes: vec![1, 0, 0, 0] });
    assert_eq!(prog.data[1].bytes, [0x00, 0x00, 0x01, 0x10, 7, 0, 0, 0]);
    assert_eq!(prog.data[2].bytes, [0, 0, 0]);
    assert_eq!(prog.data_size(), 15);
}

#[test]
fn data_without_label_opens_anonymous_block() {
    let prog = assemble(".data\n.half 0x1234\n.text\nnop").expect("assemble");
    assert_eq!(prog.data, vec![DataBlock { name: None, offset: 0, bytes: vec![0x34, 0x12] }]);
}

#[test]
fn section_mismatches_are_errors() {
    let (_, errs) = errors_of(".word 5\n.data\nadd $t0, $t0, $t0");
    assert_eq!(errs.len(), 2);
    assert!(errs[0].msg.contains(".word"));
    assert!(errs[1].msg.starts_with("instruction in .data"));
}

#[test]
fn relocation_operands() {
    let prog = assemble("lui $t0, %hi(0x12345678)\nori $t0, $t0, %lo(0x12345678)").expect("assemble");
    assert_eq!(prog.text[0], encode(&Instruction::i(OPC_LUI, 8, 0, 0x1234)));
    assert_eq!(prog.text[1], encode(&Instruction::i(OPC_ORI, 8, 8, 0x5678)));
}

#[test]
fn memory_operand_forms_agree() {
    let prog = assemble("lw $t0, 4($sp)\nlw $t0, $sp, 4\nsw $t1, ($t2)").expect("assemble");
    assert_eq!(prog.text[0], prog.text[1]);
    assert_eq!(prog.text[0], encode(&Instruction::i(OPC_LW, 8, REG_SP, 4)));
    assert_eq!(prog.text[2], encode(&Instruction::i(OPC_SW, 9, 10, 0)));
}

#[test]
fn coprocessor_moves() {
    let prog = assemble("mfc0 $t0, $13\nmtc0 $t1, $12").expect("assemble");
    assert_eq!(
        prog.text[0],
        encode(&Instruction::R { opcode: OPC_COP0, rs: COP_MF, rt: 8, rd: 13, shift: 0, funct: 0 })
    );
    assert_eq!(
        prog.text[1],
        encode(&Instruction::R { opcode: OPC_COP0, rs: COP_MT, rt: 9, rd: 12, shift: 0, funct: 0 })
    );
}

#[test]
fn jumps_encode_word_index_of_label() {
    let prog = assemble("nop\nfunc: jr $ra\njal func\njalr $t0").expect("assemble");
    assert_eq!(prog.text[2], encode(&Instruction::j(OPC_JAL, 1)));
    assert_eq!(prog.text[3], encode(&Instruction::r(FN_JALR, REG_RA, 8, 0)));
}

#[test]
fn load_relocates_jumps_onto_page() {
    let cfg = MachineConfig { text_size: 2 * TEXT_PAGE_SIZE as usize, ..MachineConfig::compact() };
    let mut m = Machine::new(cfg);
    let prog = assemble("nop\nmain: j main").expect("assemble");
    let entry = prog.load_in_machine(&mut m, 1).expect("load");
    assert_eq!(entry, TEXT_PAGE_SIZE + 4);

    let at = entry as usize;
    let word = encode(&Instruction::j(OPC_J, (TEXT_PAGE_SIZE >> 2) + 1));
    assert_eq!(m.memory().text[at..at + 4], word.to_be_bytes());

    m.set_pc(entry);
    m.clock(&mut BufferedConsole::new());
    assert_eq!(m.pc(), entry);
}

#[test]
fn code_addresses_follow_the_page() {
    let src = "
    main:
        la $t0, f
        jalr $t0
        li $v0, 10
        syscall
    f:
        li $t1, 9
        jr $ra
    ";
    let prog = assemble(src).expect("assemble");
    assert_eq!(prog.relocs, vec![Reloc::Hi { index: 0, target: 0x18 }, Reloc::Lo { index: 1, target: 0x18 }]);

    let cfg = MachineConfig { text_size: 2 * TEXT_PAGE_SIZE as usize, ..MachineConfig::compact() };
    let mut m = Machine::new(cfg);
    let entry = prog.load_in_machine(&mut m, 1).expect("load");
    m.set_pc(entry);
    m.run(&mut BufferedConsole::new(), 100);
    assert!(m.is_stopped());
    assert_eq!(m.registers().get(8), TEXT_PAGE_SIZE + 0x18);
    assert_eq!(m.registers().get(9), 9);
}

#[test]
fn word_of_text_label_is_rebased() {
    let prog = assemble(".data\nptrs: .word 7, f\n.text\nmain: nop\nf: nop").expect("assemble");
    assert_eq!(prog.relocs, vec![Reloc::Word { block: 0, offset: 4, target: 4 }]);

    let cfg = MachineConfig { text_size: 2 * TEXT_PAGE_SIZE as usize, ..MachineConfig::compact() };
    let mut m = Machine::new(cfg);
    prog.load_in_machine(&mut m, 1).expect("load");
    let got = m.memory().load32(DATA_SEGMENT_BASE + 4).expect("load");
    assert_eq!(got, TEXT_PAGE_SIZE + 4);
    assert_eq!(m.memory().load32(DATA_SEGMENT_BASE).expect("load"), 7);
    // the program itself stays page-independent
    assert_eq!(prog.data[0].bytes[4..8], 4u32.to_le_bytes());
}

#[test]
fn data_labels_are_not_relocated() {
    let prog = assemble(".data\nx: .word 1\ny: .word x\n.text\nla $t0, y").expect("assemble");
    assert!(prog.relocs.is_empty());
}

#[test]
fn oversized_data_segment_is_an_error() {
    let mut src = String::from(".data\n");
    for i in 0..256 {
        src.push_str(&format!("b{i}: .space 0x1000000\n"));
    }
    src.push_str(".byte 1\n.align 3\n");
    let (prog, errs) = errors_of(&src);
    assert_eq!(errs.len(), 256);
    assert!(errs.iter().all(|e| e.msg.starts_with("data segment exceeds")));
    assert_eq!(errs[0].line, 2);
    assert_eq!(prog.data_size(), 0x100_0000);
}

#[test]
fn load_places_data_in_segment() {
    let mut m = Machine::new(MachineConfig::compact());
    let prog = assemble(".data\nmsg: .asciiz \"ok\"\n.text\nnop").expect("assemble");
    prog.load_in_machine(&mut m, 0).expect("load");
    let off = (DATA_SEGMENT_BASE - RAM_BASE) as usize;
    assert_eq!(m.memory().ram[off..off + 3], *b"ok\0");
}

#[test]
fn load_rejects_oversized_program() {
    let mut m = Machine::new(MachineConfig::compact());
    let prog = assemble("nop").expect("assemble");
    let err = prog.load_in_machine(&mut m, 1).unwrap_err();
    assert!(matches!(err, MipsError::Load { what: "text", .. }));

    let prog = assemble(".data\nbig: .space 0x20000\n.text\nnop").expect("assemble");
    let err = prog.load_in_machine(&mut m, 0).unwrap_err();
    assert!(matches!(err, MipsError::Load { what: "data", .. }));
}
