// Opcode map follows the Plasma/MIPS-I layout.

// Primary opcodes (bits 31..26)
pub const OPC_SPECIAL: u8 = 0x00;
pub const OPC_REGIMM: u8 = 0x01;
pub const OPC_J: u8 = 0x02;
pub const OPC_JAL: u8 = 0x03;
pub const OPC_BEQ: u8 = 0x04;
pub const OPC_BNE: u8 = 0x05;
pub const OPC_BLEZ: u8 = 0x06;
pub const OPC_BGTZ: u8 = 0x07;
pub const OPC_ADDI: u8 = 0x08;
pub const OPC_ADDIU: u8 = 0x09;
pub const OPC_SLTI: u8 = 0x0A;
pub const OPC_SLTIU: u8 = 0x0B;
pub const OPC_ANDI: u8 = 0x0C;
pub const OPC_ORI: u8 = 0x0D;
pub const OPC_XORI: u8 = 0x0E;
pub const OPC_LUI: u8 = 0x0F;
pub const OPC_COP0: u8 = 0x10;
pub const OPC_COP3: u8 = 0x13;
pub const OPC_LB: u8 = 0x20;
pub const OPC_LH: u8 = 0x21;
pub const OPC_LW: u8 = 0x23;
pub const OPC_LBU: u8 = 0x24;
pub const OPC_LHU: u8 = 0x25;
pub const OPC_LWU: u8 = 0x27;
pub const OPC_SB: u8 = 0x28;
pub const OPC_SH: u8 = 0x29;
pub const OPC_SW: u8 = 0x2B;
pub const OPC_SBU: u8 = 0x2C;
pub const OPC_SHU: u8 = 0x2D;
pub const OPC_SWU: u8 = 0x2F;

// funct field of OPC_SPECIAL
pub const FN_SLL: u8 = 0x00;
pub const FN_SRL: u8 = 0x02;
pub const FN_SRA: u8 = 0x03;
pub const FN_SLLV: u8 = 0x04;
pub const FN_SRLV: u8 = 0x06;
pub const FN_SRAV: u8 = 0x07;
pub const FN_JR: u8 = 0x08;
pub const FN_JALR: u8 = 0x09;
pub const FN_SYSCALL: u8 = 0x0C;
pub const FN_BREAK: u8 = 0x0D;
pub const FN_MFHI: u8 = 0x10;
pub const FN_MTHI: u8 = 0x11;
pub const FN_MFLO: u8 = 0x12;
pub const FN_MTLO: u8 = 0x13;
pub const FN_MULT: u8 = 0x18;
pub const FN_MULTU: u8 = 0x19;
pub const FN_DIV: u8 = 0x1A;
pub const FN_DIVU: u8 = 0x1B;
pub const FN_ADD: u8 = 0x20;
pub const FN_ADDU: u8 = 0x21;
pub const FN_SUB: u8 = 0x22;
pub const FN_SUBU: u8 = 0x23;
pub const FN_AND: u8 = 0x24;
pub const FN_OR: u8 = 0x25;
pub const FN_XOR: u8 = 0x26;
pub const FN_NOR: u8 = 0x27;
pub const FN_SLT: u8 = 0x2A;
pub const FN_SLTU: u8 = 0x2B;

// rt field of OPC_REGIMM
pub const RT_BLTZ: u8 = 0x00;
pub const RT_BGEZ: u8 = 0x01;
pub const RT_BLTZAL: u8 = 0x10;
pub const RT_BGEZAL: u8 = 0x11;

// rs field of coprocessor moves
pub const COP_MF: u8 = 0x00;
pub const COP_MT: u8 = 0x04;

// Virtual address map
pub const IO_BASE: u32 = 0xFFFF_0000;
pub const PALETTE_BASE: u32 = 0xA004_0000;
pub const VRAM_BASE: u32 = 0xA000_0000;
pub const ERROR_ROM_BASE: u32 = 0x8000_0000;
pub const STACK_BASE: u32 = 0x7000_0000;
pub const RAM_BASE: u32 = 0x1000_0000;
pub const TEXT_BASE: u32 = 0x0040_0000;

/// Start of the assembler's data segment (inside RAM).
pub const DATA_SEGMENT_BASE: u32 = 0x1001_0000;
/// Granularity of `load_in_machine` placement inside the text region.
pub const TEXT_PAGE_SIZE: u32 = 0x8_0000;

pub const PALETTE_ENTRIES: usize = 256;
pub const PALETTE_SIZE: usize = PALETTE_ENTRIES * 3;

// Exception vectors (offsets into the error ROM)
pub const EXCEPTION_VECTOR: u32 = 0x17C;
pub const BREAK_VECTOR: u32 = 0x3C;

pub const REG_AT: u8 = 1;
pub const REG_V0: u8 = 2;
pub const REG_A0: u8 = 4;
pub const REG_SP: u8 = 29;
pub const REG_RA: u8 = 31;
