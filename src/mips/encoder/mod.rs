// src/mips/encoder/mod.rs
use crate::mips::instruction::Instruction;

// Layout, MSB first:
//   R: opcode(6) | rs(5) | rt(5) | rd(5) | shift(5) | funct(6)
//   I: opcode(6) | rs(5) | rt(5) | imm(16)
//   J: opcode(6) | addr(26)
#[inline] fn r(opc:u32, rs:u32, rt:u32, rd:u32, sh:u32, funct:u32) -> u32 {
    ((opc & 0x3F) << 26) | ((rs & 0x1F) << 21) | ((rt & 0x1F) << 16)
        | ((rd & 0x1F) << 11) | ((sh & 0x1F) << 6) | (funct & 0x3F)
}
#[inline] fn i(opc:u32, rs:u32, rt:u32, imm:u32) -> u32 {
    ((opc & 0x3F) << 26) | ((rs & 0x1F) << 21) | ((rt & 0x1F) << 16) | (imm & 0xFFFF)
}
#[inline] fn j(opc:u32, addr:u32) -> u32 {
    ((opc & 0x3F) << 26) | (addr & 0x03FF_FFFF)
}

/// Packs an instruction into its 32-bit word. Fields wider than their slot
/// are truncated; callers check `Instruction::is_valid` first.
pub fn encode(inst: &Instruction) -> u32 {
    match *inst {
        Instruction::R { opcode, rs, rt, rd, shift, funct } => {
            r(opcode as u32, rs as u32, rt as u32, rd as u32, shift as u32, funct as u32)
        }
        Instruction::I { opcode, rs, rt, imm } => i(opcode as u32, rs as u32, rt as u32, imm as u32),
        Instruction::J { opcode, addr } => j(opcode as u32, addr),
    }
}

/// Big-endian byte image of `encode`.
pub fn encode_bytes(inst: &Instruction) -> [u8; 4] {
    encode(inst).to_be_bytes()
}
