use crate::mips::instruction::Instruction;
use super::bits;

pub(super) fn decode(word: u32) -> Instruction {
    Instruction::R {
        opcode: bits(word, 31, 26) as u8,
        rs: bits(word, 25, 21) as u8,
        rt: bits(word, 20, 16) as u8,
        rd: bits(word, 15, 11) as u8,
        shift: bits(word, 10, 6) as u8,
        funct: bits(word, 5, 0) as u8,
    }
}
