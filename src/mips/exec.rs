// mips/exec.rs
use crate::mips::{
    arch::*,
    config::DivideByZero,
    instruction::Instruction,
    machine::{Entry, Machine},
    memory::Bus,
    syscall::{SyscallHandler, SyscallOutcome, SyscallRequest},
};

/// Exception causes, numbered as stored in Cause bits 2..6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cause {
    Interrupt,
    /// Bus error or reserved instruction.
    InstructionBus,
    Overflow,
    Syscall,
}

impl Cause {
    pub fn code(self) -> u32 {
        match self {
            Cause::Interrupt => 0,
            Cause::InstructionBus => 1,
            Cause::Overflow => 2,
            Cause::Syscall => 3,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => Cause::Interrupt,
            1 => Cause::InstructionBus,
            2 => Cause::Overflow,
            3 => Cause::Syscall,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Cause::Interrupt => "INT",
            Cause::InstructionBus => "IBUS",
            Cause::Overflow => "OVF",
            Cause::Syscall => "SYSCALL",
        }
    }
}

/// An architectural exception raised while executing one instruction.
/// Register state is left as it was before the faulting write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trap {
    pub cause: Cause,
    /// Faulting address for bus errors; copied into BVR.
    pub bad_addr: Option<u32>,
}

impl Trap {
    pub fn overflow() -> Self {
        Trap { cause: Cause::Overflow, bad_addr: None }
    }

    pub fn reserved() -> Self {
        Trap { cause: Cause::InstructionBus, bad_addr: None }
    }

    pub fn bus(addr: u32) -> Self {
        Trap { cause: Cause::InstructionBus, bad_addr: Some(addr) }
    }
}

type Exec = Result<(), Trap>;

#[inline] fn sext16(imm: u16) -> u32 { imm as i16 as i32 as u32 }

#[inline]
fn advance(m: &mut Machine) {
    m.special.pc = m.special.pc.wrapping_add(4);
}

/// Executes one decoded instruction against `m`, updating PC.
///
/// On `Err` nothing architectural has been written yet; the caller is
/// expected to enter the exception handler.
pub fn execute<H: SyscallHandler + ?Sized>(m: &mut Machine, inst: Instruction, host: &mut H) -> Exec {
    match inst {
        Instruction::R { opcode: OPC_SPECIAL, rs, rt, rd, shift, funct } => special(m, rs, rt, rd, shift, funct, host),
        Instruction::R { opcode: op @ OPC_COP0..=OPC_COP3, .. } => {
            log::warn!("coprocessor {} instruction ignored at pc 0x{:08x}", op - OPC_COP0, m.special.pc);
            advance(m);
            Ok(())
        }
        Instruction::J { opcode: op @ (OPC_J | OPC_JAL), addr } => {
            let pc = m.special.pc;
            if op == OPC_JAL {
                m.regs.set(REG_RA, pc.wrapping_add(4));
            }
            m.special.pc = (pc & 0xF000_0000) | ((addr & 0x03FF_FFFF) << 2);
            Ok(())
        }
        Instruction::I { opcode, rs, rt, imm } => immediate(m, opcode, rs, rt, imm),
        _ => Err(Trap::reserved()),
    }
}

fn special<H: SyscallHandler + ?Sized>(
    m: &mut Machine,
    rs: u8,
    rt: u8,
    rd: u8,
    shift: u8,
    funct: u8,
    host: &mut H,
) -> Exec {
    let s = m.regs.get(rs);
    let t = m.regs.get(rt);
    let pc = m.special.pc;
    match funct {
        FN_BREAK => {
            m.special.epc = pc;
            m.special.pc = BREAK_VECTOR;
            m.error_mode = true;
            m.entry = Entry::Break;
            return Ok(());
        }
        FN_SYSCALL => {
            syscall(m, host);
            return Ok(());
        }
        f if f & !0x01 == FN_JR => {
            if f & 0x01 != 0 {
                m.regs.set(rd, pc.wrapping_add(4));
            }
            m.special.pc = s;
            return Ok(());
        }
        f if f & !0x03 == FN_MFHI => {
            let lo = f & 0x02 != 0;
            match (f & 0x01 != 0, lo) {
                (true, true) => m.special.lo = s,
                (true, false) => m.special.hi = s,
                (false, true) => m.regs.set(rd, m.special.lo),
                (false, false) => m.regs.set(rd, m.special.hi),
            }
        }
        f if f & 0x20 != 0 => {
            let v = alu(f, s, t)?;
            m.regs.set(rd, v);
        }
        f if f & !0x03 == FN_MULT => mul_div(m, f, s, t)?,
        f if f & !0x03 == FN_SLLV => {
            let v = shift_op(f, t, s & 0x1F).ok_or(Trap::reserved())?;
            m.regs.set(rd, v);
        }
        f if f & !0x03 == FN_SLL => {
            let v = shift_op(f, t, (shift & 0x1F) as u32).ok_or(Trap::reserved())?;
            m.regs.set(rd, v);
        }
        _ => return Err(Trap::reserved()),
    }
    advance(m);
    Ok(())
}

/// Funct 0x20..0x3F: bit 3 selects compares, bit 2 logic ops, otherwise
/// add/sub with bit 1 for subtract and bit 0 for the non-trapping form.
fn alu(f: u8, s: u32, t: u32) -> Result<u32, Trap> {
    let unsigned = f & 0x01 != 0;
    Ok(if f & 0x08 != 0 {
        if unsigned { (s < t) as u32 } else { ((s as i32) < (t as i32)) as u32 }
    } else if f & 0x04 != 0 {
        match f & 0x03 {
            0 => s & t,
            1 => s | t,
            2 => s ^ t,
            _ => !(s | t),
        }
    } else {
        let sub = f & 0x02 != 0;
        match (sub, unsigned) {
            (false, false) => (s as i32).checked_add(t as i32).ok_or(Trap::overflow())? as u32,
            (true, false) => (s as i32).checked_sub(t as i32).ok_or(Trap::overflow())? as u32,
            (false, true) => s.wrapping_add(t),
            (true, true) => s.wrapping_sub(t),
        }
    })
}

fn mul_div(m: &mut Machine, f: u8, s: u32, t: u32) -> Exec {
    let unsigned = f & 0x01 != 0;
    if f & 0x02 == 0 {
        let p = if unsigned {
            (s as u64) * (t as u64)
        } else {
            ((s as i32 as i64) * (t as i32 as i64)) as u64
        };
        m.special.hi = (p >> 32) as u32;
        m.special.lo = p as u32;
        return Ok(());
    }
    if t == 0 {
        return match m.config.divide_by_zero {
            DivideByZero::Ignore => {
                log::warn!("division by zero at pc 0x{:08x}; HI/LO unchanged", m.special.pc);
                Ok(())
            }
            DivideByZero::Overflow => Err(Trap::overflow()),
        };
    }
    let (q, r) = if unsigned {
        (s / t, s % t)
    } else {
        let (a, b) = (s as i32, t as i32);
        (a.wrapping_div(b) as u32, a.wrapping_rem(b) as u32)
    };
    m.special.lo = q;
    m.special.hi = r;
    Ok(())
}

fn shift_op(f: u8, value: u32, amount: u32) -> Option<u32> {
    match f & 0x03 {
        0 => Some(value << amount),
        2 => Some(value >> amount),
        3 => Some(((value as i32) >> amount) as u32),
        _ => None,
    }
}

fn syscall<H: SyscallHandler + ?Sized>(m: &mut Machine, host: &mut H) {
    let req = SyscallRequest {
        code: m.regs.get(REG_V0),
        args: [0, 1, 2, 3].map(|i| m.regs.get(REG_A0 + i)),
    };
    log::debug!("syscall {} args {:x?}", req.code, req.args);
    match host.syscall(req, m) {
        SyscallOutcome::Continue => advance(m),
        SyscallOutcome::Stop => {
            m.stopped = true;
            advance(m);
        }
        SyscallOutcome::Suspend => m.paused = true,
    }
}

fn branch(m: &mut Machine, taken: bool, imm: u16) {
    let next = m.special.pc.wrapping_add(4);
    m.special.pc = if taken { next.wrapping_add(sext16(imm) << 2) } else { next };
}

fn immediate(m: &mut Machine, opcode: u8, rs: u8, rt: u8, imm: u16) -> Exec {
    let s = m.regs.get(rs);
    let simm = sext16(imm);
    let zimm = imm as u32;
    let value = match opcode {
        OPC_REGIMM => {
            let taken = match rt {
                RT_BLTZ | RT_BLTZAL => (s as i32) < 0,
                RT_BGEZ | RT_BGEZAL => (s as i32) >= 0,
                _ => return Err(Trap::reserved()),
            };
            if rt & 0x10 != 0 {
                m.regs.set(REG_RA, m.special.pc.wrapping_add(4));
            }
            branch(m, taken, imm);
            return Ok(());
        }
        OPC_BEQ | OPC_BNE | OPC_BLEZ | OPC_BGTZ => {
            let t = m.regs.get(rt);
            let taken = match opcode {
                OPC_BEQ => s == t,
                OPC_BNE => s != t,
                OPC_BLEZ => (s as i32) <= 0,
                _ => (s as i32) > 0,
            };
            branch(m, taken, imm);
            return Ok(());
        }
        OPC_ADDI => (s as i32).checked_add(simm as i32).ok_or(Trap::overflow())? as u32,
        OPC_ADDIU => s.wrapping_add(simm),
        OPC_SLTI => ((s as i32) < (simm as i32)) as u32,
        OPC_SLTIU => (s < simm) as u32,
        OPC_ANDI => s & zimm,
        OPC_ORI => s | zimm,
        OPC_XORI => s ^ zimm,
        OPC_LUI => zimm << 16,
        OPC_LB | OPC_LH | OPC_LW | OPC_LBU | OPC_LHU | OPC_LWU => {
            let addr = s.wrapping_add(simm);
            let mem = &m.memory;
            let loaded = match opcode {
                OPC_LB => mem.load8(addr).map(|v| v as i8 as i32 as u32),
                OPC_LH => mem.load16(addr).map(|v| v as i16 as i32 as u32),
                OPC_LBU => mem.load8(addr).map(u32::from),
                OPC_LHU => mem.load16(addr).map(u32::from),
                _ => mem.load32(addr),
            };
            loaded.map_err(|_| Trap::bus(addr))?
        }
        OPC_SB | OPC_SH | OPC_SW | OPC_SBU | OPC_SHU | OPC_SWU => {
            let addr = s.wrapping_add(simm);
            let t = m.regs.get(rt);
            let mem = &mut m.memory;
            let stored = match opcode {
                OPC_SB | OPC_SBU => mem.store8(addr, t as u8),
                OPC_SH | OPC_SHU => mem.store16(addr, t as u16),
                _ => mem.store32(addr, t),
            };
            stored.map_err(|_| Trap::bus(addr))?;
            advance(m);
            return Ok(());
        }
        _ => return Err(Trap::reserved()),
    };
    m.regs.set(rt, value);
    advance(m);
    Ok(())
}
