// mips/instruction.rs
use super::arch::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    R,
    I,
    J,
}

impl Format {
    /// Encoding shape used by a primary opcode.
    pub fn of_opcode(opcode: u8) -> Format {
        match opcode {
            OPC_SPECIAL | OPC_COP0..=OPC_COP3 => Format::R,
            OPC_J | OPC_JAL => Format::J,
            _ => Format::I,
        }
    }
}

/// A structured instruction word, tagged by encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    R { opcode: u8, rs: u8, rt: u8, rd: u8, shift: u8, funct: u8 },
    I { opcode: u8, rs: u8, rt: u8, imm: u16 },
    J { opcode: u8, addr: u32 },
}

impl Instruction {
    pub fn r(funct: u8, rd: u8, rs: u8, rt: u8) -> Self {
        Instruction::R { opcode: OPC_SPECIAL, rs, rt, rd, shift: 0, funct }
    }

    pub fn shift(funct: u8, rd: u8, rt: u8, shift: u8) -> Self {
        Instruction::R { opcode: OPC_SPECIAL, rs: 0, rt, rd, shift, funct }
    }

    pub fn i(opcode: u8, rt: u8, rs: u8, imm: u16) -> Self {
        Instruction::I { opcode, rs, rt, imm }
    }

    pub fn j(opcode: u8, addr: u32) -> Self {
        Instruction::J { opcode, addr }
    }

    pub fn format(&self) -> Format {
        match self {
            Instruction::R { .. } => Format::R,
            Instruction::I { .. } => Format::I,
            Instruction::J { .. } => Format::J,
        }
    }

    pub fn opcode(&self) -> u8 {
        match *self {
            Instruction::R { opcode, .. } | Instruction::I { opcode, .. } | Instruction::J { opcode, .. } => opcode,
        }
    }

    /// True when every field fits its bit width, so `encode` loses nothing.
    pub fn is_valid(&self) -> bool {
        match *self {
            Instruction::R { opcode, rs, rt, rd, shift, funct } => {
                opcode < 64 && rs < 32 && rt < 32 && rd < 32 && shift < 32 && funct < 64
            }
            Instruction::I { opcode, rs, rt, .. } => opcode < 64 && rs < 32 && rt < 32,
            Instruction::J { opcode, addr } => opcode < 64 && addr < (1 << 26),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_follow_opcode_map() {
        assert_eq!(Format::of_opcode(OPC_SPECIAL), Format::R);
        assert_eq!(Format::of_opcode(OPC_COP0), Format::R);
        assert_eq!(Format::of_opcode(OPC_JAL), Format::J);
        assert_eq!(Format::of_opcode(OPC_BEQ), Format::I);
        assert_eq!(Format::of_opcode(OPC_SW), Format::I);
    }

    #[test]
    fn out_of_range_fields_are_invalid() {
        assert!(Instruction::r(FN_ADD, 10, 8, 9).is_valid());
        assert!(!Instruction::r(FN_ADD, 32, 8, 9).is_valid());
        assert!(!Instruction::shift(FN_SLL, 1, 2, 40).is_valid());
        assert!(!Instruction::j(OPC_J, 1 << 26).is_valid());
        assert!(!Instruction::i(64, 0, 0, 0).is_valid());
    }
}
