use crate::mips::instruction::Instruction;
use super::bits;

pub(super) fn decode(word: u32) -> Instruction {
    Instruction::J {
        opcode: bits(word, 31, 26) as u8,
        addr: bits(word, 25, 0),
    }
}
