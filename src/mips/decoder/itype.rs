use crate::mips::instruction::Instruction;
use super::bits;

pub(super) fn decode(word: u32) -> Instruction {
    Instruction::I {
        opcode: bits(word, 31, 26) as u8,
        rs: bits(word, 25, 21) as u8,
        rt: bits(word, 20, 16) as u8,
        imm: bits(word, 15, 0) as u16,
    }
}
