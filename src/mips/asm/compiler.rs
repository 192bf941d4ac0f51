use std::collections::HashMap;

use crate::mips::arch::*;
use crate::mips::instruction::Instruction;

use super::program::Symbol;
use super::utils::{parse_imm, parse_memop, parse_reg, parse_reloc};

// rd, rs, rt
const ALU: &[(&str, u8)] = &[
    ("add", FN_ADD),
    ("addu", FN_ADDU),
    ("sub", FN_SUB),
    ("subu", FN_SUBU),
    ("and", FN_AND),
    ("or", FN_OR),
    ("xor", FN_XOR),
    ("nor", FN_NOR),
    ("slt", FN_SLT),
    ("sltu", FN_SLTU),
];
// rd, rt, shamt
const SHIFT_IMM: &[(&str, u8)] = &[("sll", FN_SLL), ("srl", FN_SRL), ("sra", FN_SRA)];
// rd, rt, rs
const SHIFT_VAR: &[(&str, u8)] = &[("sllv", FN_SLLV), ("srlv", FN_SRLV), ("srav", FN_SRAV)];
// rs, rt
const MUL_DIV: &[(&str, u8)] = &[("mult", FN_MULT), ("multu", FN_MULTU), ("div", FN_DIV), ("divu", FN_DIVU)];
// rt, rs, imm
const IMM_OPS: &[(&str, u8)] = &[
    ("addi", OPC_ADDI),
    ("addiu", OPC_ADDIU),
    ("slti", OPC_SLTI),
    ("sltiu", OPC_SLTIU),
    ("andi", OPC_ANDI),
    ("ori", OPC_ORI),
    ("xori", OPC_XORI),
];
const BRANCH_CMP: &[(&str, u8)] = &[("beq", OPC_BEQ), ("bne", OPC_BNE)];
const BRANCH_ZERO: &[(&str, u8)] = &[("blez", OPC_BLEZ), ("bgtz", OPC_BGTZ)];
// rt field of REGIMM
const BRANCH_REGIMM: &[(&str, u8)] = &[
    ("bltz", RT_BLTZ),
    ("bgez", RT_BGEZ),
    ("bltzal", RT_BLTZAL),
    ("bgezal", RT_BGEZAL),
];
const MEMORY: &[(&str, u8)] = &[
    ("lb", OPC_LB),
    ("lh", OPC_LH),
    ("lw", OPC_LW),
    ("lbu", OPC_LBU),
    ("lhu", OPC_LHU),
    ("lwu", OPC_LWU),
    ("sb", OPC_SB),
    ("sh", OPC_SH),
    ("sw", OPC_SW),
    ("sbu", OPC_SBU),
    ("shu", OPC_SHU),
    ("swu", OPC_SWU),
];

fn lookup(table: &[(&str, u8)], mnemonic: &str) -> Option<u8> {
    table.iter().find(|(m, _)| *m == mnemonic).map(|&(_, code)| code)
}

fn expect(mnemonic: &str, ops: &[String], n: usize, shape: &str) -> Result<(), String> {
    if ops.len() == n {
        Ok(())
    } else if n == 0 {
        Err(format!("{mnemonic} takes no operands"))
    } else {
        Err(format!("{mnemonic}: expected '{shape}'"))
    }
}

/// Operand resolution for one instruction at stream offset `pc`.
///
/// Bad operands are recorded in `soft` and replaced by zero so the rest of
/// the program still assembles.
pub(crate) struct Ctx<'a> {
    pub symbols: &'a HashMap<String, Symbol>,
    pub pc: u32,
    pub soft: Vec<String>,
    /// Set when a `%hi`/`%lo` operand named a text label: (hi, offset).
    pub text_ref: Option<(bool, u32)>,
}

impl<'a> Ctx<'a> {
    pub(crate) fn new(symbols: &'a HashMap<String, Symbol>, pc: u32) -> Self {
        Ctx { symbols, pc, soft: Vec::new(), text_ref: None }
    }

    fn fail<T: Default>(&mut self, msg: String) -> T {
        self.soft.push(msg);
        T::default()
    }

    fn symbol(&mut self, name: &str) -> Option<Symbol> {
        let sym = self.symbols.get(name).copied();
        if sym.is_none() {
            self.soft.push(format!("label not found: {name}"));
        }
        sym
    }

    fn reg(&mut self, tok: &str) -> u8 {
        match parse_reg(tok) {
            Some(r) => r,
            None => self.fail(format!("invalid register: {tok}")),
        }
    }

    fn value(&mut self, tok: &str) -> Option<i64> {
        if let Some((hi, inner)) = parse_reloc(tok) {
            let addr = match parse_imm(inner) {
                Some(v) => v as u32,
                None => {
                    let sym = self.symbol(inner)?;
                    if let Symbol::Text(off) = sym {
                        self.text_ref = Some((hi, off));
                    }
                    sym.address()
                }
            };
            let half = if hi { addr >> 16 } else { addr & 0xFFFF };
            return Some(half as i64);
        }
        let v = parse_imm(tok);
        if v.is_none() {
            self.soft.push(format!("invalid immediate: {tok}"));
        }
        v
    }

    /// 16-bit immediate, signed or unsigned.
    fn imm16(&mut self, tok: &str) -> u16 {
        match self.value(tok) {
            Some(v) if (-0x8000..=0xFFFF).contains(&v) => v as u16,
            Some(v) => self.fail(format!("immediate {v} does not fit 16 bits")),
            None => 0,
        }
    }

    fn shamt(&mut self, tok: &str) -> u8 {
        match parse_imm(tok) {
            Some(v) if (0..32).contains(&v) => v as u8,
            _ => self.fail(format!("invalid shift amount: {tok}")),
        }
    }

    /// Word displacement from the instruction after this one.
    fn branch(&mut self, tok: &str) -> u16 {
        let disp = match parse_imm(tok) {
            Some(v) => v,
            None => match self.symbol(tok) {
                Some(Symbol::Text(target)) => (target as i64 - (self.pc as i64 + 4)) / 4,
                Some(Symbol::Data(_)) => return self.fail(format!("branch target {tok} is a data label")),
                None => return 0,
            },
        };
        if (i16::MIN as i64..=i16::MAX as i64).contains(&disp) {
            disp as i16 as u16
        } else {
            self.fail(format!("branch displacement {disp} out of 16-bit range"))
        }
    }

    /// 26-bit word index of a jump target.
    fn jump(&mut self, tok: &str) -> u32 {
        let addr = match parse_imm(tok) {
            Some(v) if (0..=u32::MAX as i64).contains(&v) => v as u32,
            Some(v) => return self.fail(format!("jump target {v} out of range")),
            None => match self.symbol(tok) {
                Some(Symbol::Text(off)) => off,
                Some(Symbol::Data(_)) => return self.fail(format!("jump target {tok} is a data label")),
                None => return 0,
            },
        };
        if addr & 3 != 0 {
            return self.fail(format!("jump target 0x{addr:x} is not word aligned"));
        }
        (addr >> 2) & 0x03FF_FFFF
    }

    /// `rt, imm($base)` or `rt, $base, imm`.
    fn memory(&mut self, mnemonic: &str, ops: &[String]) -> Result<(u8, u8, u16), String> {
        match ops {
            [rt, addr] => {
                let (imm, base) =
                    parse_memop(addr).ok_or_else(|| format!("{mnemonic}: expected 'rt, imm($base)'"))?;
                let rt = self.reg(rt);
                let imm = if imm.is_empty() { 0 } else { self.imm16(imm) };
                Ok((rt, self.reg(base), imm))
            }
            [rt, base, imm] => Ok((self.reg(rt), self.reg(base), self.imm16(imm))),
            _ => Err(format!("{mnemonic}: expected 'rt, imm($base)' or 'rt, $base, imm'")),
        }
    }
}

/// Compiles one real instruction. `Err` means nothing sensible could be
/// emitted; operand problems are reported through `ctx.soft` instead.
pub(crate) fn compile(mnemonic: &str, ops: &[String], ctx: &mut Ctx<'_>) -> Result<Instruction, String> {
    if let Some(f) = lookup(ALU, mnemonic) {
        expect(mnemonic, ops, 3, "rd, rs, rt")?;
        return Ok(Instruction::r(f, ctx.reg(&ops[0]), ctx.reg(&ops[1]), ctx.reg(&ops[2])));
    }
    if let Some(f) = lookup(SHIFT_IMM, mnemonic) {
        expect(mnemonic, ops, 3, "rd, rt, shamt")?;
        return Ok(Instruction::shift(f, ctx.reg(&ops[0]), ctx.reg(&ops[1]), ctx.shamt(&ops[2])));
    }
    if let Some(f) = lookup(SHIFT_VAR, mnemonic) {
        expect(mnemonic, ops, 3, "rd, rt, rs")?;
        let (rd, rt, rs) = (ctx.reg(&ops[0]), ctx.reg(&ops[1]), ctx.reg(&ops[2]));
        return Ok(Instruction::r(f, rd, rs, rt));
    }
    if let Some(f) = lookup(MUL_DIV, mnemonic) {
        expect(mnemonic, ops, 2, "rs, rt")?;
        return Ok(Instruction::r(f, 0, ctx.reg(&ops[0]), ctx.reg(&ops[1])));
    }
    if let Some(op) = lookup(IMM_OPS, mnemonic) {
        expect(mnemonic, ops, 3, "rt, rs, imm")?;
        return Ok(Instruction::i(op, ctx.reg(&ops[0]), ctx.reg(&ops[1]), ctx.imm16(&ops[2])));
    }
    if let Some(op) = lookup(BRANCH_CMP, mnemonic) {
        expect(mnemonic, ops, 3, "rs, rt, label")?;
        let (rs, rt) = (ctx.reg(&ops[0]), ctx.reg(&ops[1]));
        return Ok(Instruction::i(op, rt, rs, ctx.branch(&ops[2])));
    }
    if let Some(op) = lookup(BRANCH_ZERO, mnemonic) {
        expect(mnemonic, ops, 2, "rs, label")?;
        return Ok(Instruction::i(op, 0, ctx.reg(&ops[0]), ctx.branch(&ops[1])));
    }
    if let Some(rt) = lookup(BRANCH_REGIMM, mnemonic) {
        expect(mnemonic, ops, 2, "rs, label")?;
        return Ok(Instruction::i(OPC_REGIMM, rt, ctx.reg(&ops[0]), ctx.branch(&ops[1])));
    }
    if let Some(op) = lookup(MEMORY, mnemonic) {
        let (rt, base, imm) = ctx.memory(mnemonic, ops)?;
        return Ok(Instruction::i(op, rt, base, imm));
    }

    match mnemonic {
        "lui" => {
            expect(mnemonic, ops, 2, "rt, imm")?;
            Ok(Instruction::i(OPC_LUI, ctx.reg(&ops[0]), 0, ctx.imm16(&ops[1])))
        }
        "j" | "jal" => {
            expect(mnemonic, ops, 1, "target")?;
            let op = if mnemonic == "j" { OPC_J } else { OPC_JAL };
            Ok(Instruction::j(op, ctx.jump(&ops[0])))
        }
        "jr" => {
            expect(mnemonic, ops, 1, "rs")?;
            Ok(Instruction::r(FN_JR, 0, ctx.reg(&ops[0]), 0))
        }
        "jalr" => match ops {
            [rs] => Ok(Instruction::r(FN_JALR, REG_RA, ctx.reg(rs), 0)),
            [rd, rs] => Ok(Instruction::r(FN_JALR, ctx.reg(rd), ctx.reg(rs), 0)),
            _ => Err("jalr: expected 'rs' or 'rd, rs'".into()),
        },
        "mfhi" | "mflo" => {
            expect(mnemonic, ops, 1, "rd")?;
            let f = if mnemonic == "mfhi" { FN_MFHI } else { FN_MFLO };
            Ok(Instruction::r(f, ctx.reg(&ops[0]), 0, 0))
        }
        "mthi" | "mtlo" => {
            expect(mnemonic, ops, 1, "rs")?;
            let f = if mnemonic == "mthi" { FN_MTHI } else { FN_MTLO };
            Ok(Instruction::r(f, 0, ctx.reg(&ops[0]), 0))
        }
        "syscall" | "break" => {
            expect(mnemonic, ops, 0, "")?;
            let f = if mnemonic == "syscall" { FN_SYSCALL } else { FN_BREAK };
            Ok(Instruction::r(f, 0, 0, 0))
        }
        "mfc0" | "mtc0" => {
            expect(mnemonic, ops, 2, "rt, rd")?;
            let rs = if mnemonic == "mfc0" { COP_MF } else { COP_MT };
            let (rt, rd) = (ctx.reg(&ops[0]), ctx.reg(&ops[1]));
            Ok(Instruction::R { opcode: OPC_COP0, rs, rt, rd, shift: 0, funct: 0 })
        }
        _ => Err(format!("unknown mnemonic: {mnemonic}")),
    }
}
