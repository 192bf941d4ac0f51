mod itype;
mod jtype;
mod rtype;

use crate::mips::arch::*;
use crate::mips::errors::{MipsError, Result};
use crate::mips::instruction::{Format, Instruction};
use crate::mips::registers::reg_name;

#[inline] fn bits(v: u32, hi: u8, lo: u8) -> u32 { (v >> lo) & ((1u32 << (hi - lo + 1)) - 1) }

/// Decodes the first four bytes of `buf` (big-endian).
pub fn decode(buf: &[u8]) -> Result<Instruction> {
    let bytes: [u8; 4] = buf
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or(MipsError::ShortBuffer { len: buf.len() })?;
    Ok(decode_word(u32::from_be_bytes(bytes)))
}

/// Splits a word using the format implied by its opcode.
pub fn decode_word(word: u32) -> Instruction {
    decode_as(Format::of_opcode(bits(word, 31, 26) as u8), word)
}

pub fn decode_as(format: Format, word: u32) -> Instruction {
    match format {
        Format::R => rtype::decode(word),
        Format::I => itype::decode(word),
        Format::J => jtype::decode(word),
    }
}

pub fn disasm(word: u32) -> String {
    let r = |i: u8| format!("${}", reg_name(i));
    match decode_word(word) {
        Instruction::R { opcode: OPC_SPECIAL, rs, rt, rd, shift, funct } => match funct {
            FN_SLL if word == 0 => "nop".into(),
            FN_SLL | FN_SRL | FN_SRA => {
                let m = ["sll", "", "srl", "sra"][(funct & 3) as usize];
                format!("{m} {}, {}, {shift}", r(rd), r(rt))
            }
            FN_SLLV | FN_SRLV | FN_SRAV => {
                let m = ["sllv", "", "srlv", "srav"][(funct & 3) as usize];
                format!("{m} {}, {}, {}", r(rd), r(rt), r(rs))
            }
            FN_JR => format!("jr {}", r(rs)),
            FN_JALR => format!("jalr {}, {}", r(rd), r(rs)),
            FN_SYSCALL => "syscall".into(),
            FN_BREAK => "break".into(),
            FN_MFHI => format!("mfhi {}", r(rd)),
            FN_MFLO => format!("mflo {}", r(rd)),
            FN_MTHI => format!("mthi {}", r(rs)),
            FN_MTLO => format!("mtlo {}", r(rs)),
            FN_MULT | FN_MULTU | FN_DIV | FN_DIVU => {
                let m = ["mult", "multu", "div", "divu"][(funct & 3) as usize];
                format!("{m} {}, {}", r(rs), r(rt))
            }
            FN_ADD | FN_ADDU | FN_SUB | FN_SUBU | FN_AND | FN_OR | FN_XOR | FN_NOR | FN_SLT
            | FN_SLTU => {
                let m = match funct {
                    FN_ADD => "add",
                    FN_ADDU => "addu",
                    FN_SUB => "sub",
                    FN_SUBU => "subu",
                    FN_AND => "and",
                    FN_OR => "or",
                    FN_XOR => "xor",
                    FN_NOR => "nor",
                    FN_SLT => "slt",
                    _ => "sltu",
                };
                format!("{m} {}, {}, {}", r(rd), r(rs), r(rt))
            }
            _ => format!(".word 0x{word:08x} ; reserved funct 0x{funct:02x}"),
        },
        Instruction::R { opcode, rs, rt, rd, .. } => {
            let dir = if rs == COP_MT { "mt" } else { "mf" };
            format!("{dir}c{} {}, ${rd}", opcode - OPC_COP0, r(rt))
        }
        Instruction::J { opcode, addr } => {
            let m = if opcode == OPC_JAL { "jal" } else { "j" };
            format!("{m} 0x{:x}", addr << 2)
        }
        Instruction::I { opcode, rs, rt, imm } => {
            let simm = imm as i16;
            match opcode {
                OPC_REGIMM => {
                    let m = match rt {
                        RT_BLTZ => "bltz",
                        RT_BGEZ => "bgez",
                        RT_BLTZAL => "bltzal",
                        RT_BGEZAL => "bgezal",
                        _ => return format!(".word 0x{word:08x} ; reserved regimm"),
                    };
                    format!("{m} {}, {simm}", r(rs))
                }
                OPC_BEQ => format!("beq {}, {}, {simm}", r(rs), r(rt)),
                OPC_BNE => format!("bne {}, {}, {simm}", r(rs), r(rt)),
                OPC_BLEZ => format!("blez {}, {simm}", r(rs)),
                OPC_BGTZ => format!("bgtz {}, {simm}", r(rs)),
                OPC_ADDI => format!("addi {}, {}, {simm}", r(rt), r(rs)),
                OPC_ADDIU => format!("addiu {}, {}, {simm}", r(rt), r(rs)),
                OPC_SLTI => format!("slti {}, {}, {simm}", r(rt), r(rs)),
                OPC_SLTIU => format!("sltiu {}, {}, {simm}", r(rt), r(rs)),
                OPC_ANDI => format!("andi {}, {}, 0x{imm:x}", r(rt), r(rs)),
                OPC_ORI => format!("ori {}, {}, 0x{imm:x}", r(rt), r(rs)),
                OPC_XORI => format!("xori {}, {}, 0x{imm:x}", r(rt), r(rs)),
                OPC_LUI => format!("lui {}, 0x{imm:x}", r(rt)),
                OPC_LB | OPC_LH | OPC_LW | OPC_LBU | OPC_LHU | OPC_LWU | OPC_SB | OPC_SH
                | OPC_SW | OPC_SBU | OPC_SHU | OPC_SWU => {
                    let m = match opcode {
                        OPC_LB => "lb",
                        OPC_LH => "lh",
                        OPC_LW => "lw",
                        OPC_LBU => "lbu",
                        OPC_LHU => "lhu",
                        OPC_LWU => "lwu",
                        OPC_SB => "sb",
                        OPC_SH => "sh",
                        OPC_SW => "sw",
                        OPC_SBU => "sbu",
                        OPC_SHU => "shu",
                        _ => "swu",
                    };
                    format!("{m} {}, {simm}({})", r(rt), r(rs))
                }
                _ => format!(".word 0x{word:08x} ; unknown opcode 0x{opcode:02x}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mips::encoder::{encode, encode_bytes};
    use proptest::prelude::*;

    #[test]
    fn short_buffer_is_rejected() {
        let err = decode(&[0x01, 0x09, 0x50]).unwrap_err();
        assert!(matches!(err, MipsError::ShortBuffer { len: 3 }));
        assert!(err.to_string().contains("24 bit"));
    }

    #[test]
    fn extra_bytes_are_ignored() {
        let inst = decode(&[0x01, 0x09, 0x50, 0x20, 0xFF]).unwrap();
        assert_eq!(inst, Instruction::r(FN_ADD, 10, 8, 9));
    }

    #[test]
    fn disasm_reads_back_registers() {
        assert_eq!(disasm(0x0109_5020), "add $t2, $t0, $t1");
        assert_eq!(disasm(0x2008_0005), "addi $t0, $zero, 5");
        assert_eq!(disasm(0), "nop");
        assert_eq!(disasm(encode(&Instruction::i(OPC_LW, 8, 29, 0xFFFC))), "lw $t0, -4($sp)");
        assert!(disasm(0xFC00_0000).starts_with(".word"));
    }

    fn any_r() -> impl Strategy<Value = Instruction> {
        (0u8..32, 0u8..32, 0u8..32, 0u8..32, 0u8..64).prop_map(|(rs, rt, rd, shift, funct)| {
            Instruction::R { opcode: OPC_SPECIAL, rs, rt, rd, shift, funct }
        })
    }

    fn any_i() -> impl Strategy<Value = Instruction> {
        let opcode = (0u8..64).prop_filter("I-format opcode", |op| Format::of_opcode(*op) == Format::I);
        (opcode, 0u8..32, 0u8..32, any::<u16>())
            .prop_map(|(opcode, rs, rt, imm)| Instruction::I { opcode, rs, rt, imm })
    }

    fn any_j() -> impl Strategy<Value = Instruction> {
        (prop_oneof![Just(OPC_J), Just(OPC_JAL)], 0u32..(1 << 26))
            .prop_map(|(opcode, addr)| Instruction::J { opcode, addr })
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(inst in prop_oneof![any_r(), any_i(), any_j()]) {
            prop_assert!(inst.is_valid());
            prop_assert_eq!(decode_word(encode(&inst)), inst);
            prop_assert_eq!(decode(&encode_bytes(&inst)).unwrap(), inst);
        }
    }
}
