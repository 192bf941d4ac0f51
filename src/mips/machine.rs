// mips/machine.rs
use serde::{Deserialize, Serialize};

use crate::mips::{
    arch::*,
    config::MachineConfig,
    decoder::{decode_word, disasm},
    exec::{self, Cause, Trap},
    memory::{Memory, Region},
    registers::{RegisterFile, SpecialRegisters},
    syscall::SyscallHandler,
};

/// Result of a single clock pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// One instruction executed.
    Retired,
    /// An exception was taken; PC now points at the handler.
    Trapped(Cause),
    /// Paused or stopped; nothing ran.
    Idle,
}

/// How error mode was last entered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entry {
    /// An exception: Status was pushed, EPC holds the faulting instruction.
    #[default]
    Exception,
    /// A BREAK: nothing was pushed, EPC holds the BREAK itself.
    Break,
}

/// Interrupt lines occupy six bits of Cause, starting at bit 9.
const INTERRUPT_MASK: u32 = 0x3F;

/// A clock-stepped CPU with its memory regions.
///
/// PC is an offset into the active code region: the text region normally,
/// the error ROM once an exception or BREAK has been taken.
#[derive(Debug, Clone)]
pub struct Machine {
    pub(crate) config: MachineConfig,
    pub(crate) regs: RegisterFile,
    pub(crate) special: SpecialRegisters,
    pub(crate) memory: Memory,
    pub(crate) error_mode: bool,
    pub(crate) entry: Entry,
    pub(crate) stopped: bool,
    pub(crate) paused: bool,
    pub(crate) interrupt_lines: u32,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(MachineConfig::default())
    }
}

impl Machine {
    pub fn new(config: MachineConfig) -> Self {
        let mut regs = RegisterFile::default();
        if config.init_stack_pointer && config.stack_size >= 4 {
            regs.set(REG_SP, STACK_BASE.wrapping_add(config.stack_size as u32 - 4));
        }
        let special = SpecialRegisters {
            pc: config.initial_pc,
            status: config.initial_status,
            ..SpecialRegisters::default()
        };
        Self {
            memory: Memory::new(&config),
            config,
            regs,
            special,
            error_mode: false,
            entry: Entry::Exception,
            stopped: false,
            paused: false,
            interrupt_lines: 0,
        }
    }

    pub fn config(&self) -> &MachineConfig { &self.config }
    pub fn registers(&self) -> &RegisterFile { &self.regs }
    pub fn registers_mut(&mut self) -> &mut RegisterFile { &mut self.regs }
    pub fn special(&self) -> &SpecialRegisters { &self.special }
    pub fn special_mut(&mut self) -> &mut SpecialRegisters { &mut self.special }
    pub fn memory(&self) -> &Memory { &self.memory }
    pub fn memory_mut(&mut self) -> &mut Memory { &mut self.memory }

    pub fn pc(&self) -> u32 {
        self.special.pc
    }

    pub fn set_pc(&mut self, pc: u32) {
        self.special.pc = pc;
    }

    /// True while fetching from the error ROM.
    pub fn error_mode(&self) -> bool {
        self.error_mode
    }

    pub fn code_region(&self) -> Region {
        if self.error_mode { Region::ErrorRom } else { Region::Text }
    }

    fn code_base(&self) -> u32 {
        if self.error_mode { ERROR_ROM_BASE } else { TEXT_BASE }
    }

    pub fn is_paused(&self) -> bool { self.paused }
    pub fn is_stopped(&self) -> bool { self.stopped }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            log::debug!("resuming at pc 0x{:08x}", self.special.pc);
        }
        self.paused = false;
    }

    /// Flips the paused flag and returns the new value.
    pub fn toggle(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn interrupt_lines(&self) -> u32 {
        self.interrupt_lines
    }

    /// Drives the external interrupt lines. While any line is high and
    /// Status bit 0 is set, the next clock takes an INT exception.
    pub fn set_interrupt_lines(&mut self, lines: u32) {
        self.interrupt_lines = lines & INTERRUPT_MASK;
    }

    /// Fetches, decodes and executes one instruction.
    pub fn clock<H: SyscallHandler + ?Sized>(&mut self, host: &mut H) -> Tick {
        if self.stopped || self.paused {
            return Tick::Idle;
        }
        if self.interrupt_lines != 0 && self.special.status & 1 != 0 && !self.error_mode {
            self.raise(Trap { cause: Cause::Interrupt, bad_addr: None }, None);
            return Tick::Trapped(Cause::Interrupt);
        }

        let pc = self.special.pc;
        let Some(word) = self.memory.fetch(self.code_region(), pc) else {
            let trap = Trap::bus(self.code_base().wrapping_add(pc));
            self.raise(trap, None);
            return Tick::Trapped(trap.cause);
        };
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("{:08x}: {:08x}  {}", pc, word, disasm(word));
        }

        match exec::execute(self, decode_word(word), host) {
            Ok(()) => Tick::Retired,
            Err(trap) => {
                self.raise(trap, Some(word));
                Tick::Trapped(trap.cause)
            }
        }
    }

    /// Clocks until stopped, paused, or `max_clocks` pulses have run.
    /// Returns the number of pulses that did work.
    pub fn run<H: SyscallHandler + ?Sized>(&mut self, host: &mut H, max_clocks: usize) -> usize {
        let mut n = 0;
        while n < max_clocks {
            if self.clock(host) == Tick::Idle {
                break;
            }
            n += 1;
        }
        n
    }

    fn raise(&mut self, trap: Trap, word: Option<u32>) {
        let source = word.map_or_else(|| "<no instruction>".to_string(), disasm);
        log::warn!(
            "MIPS exception {} ({}) at pc 0x{:08x} running {}",
            trap.cause.code(),
            trap.cause.name(),
            self.special.pc,
            source
        );
        self.special.cause = (trap.cause.code() << 2) | (self.interrupt_lines << 9);
        self.special.status <<= 4;
        if let Some(addr) = trap.bad_addr {
            self.special.bvr = addr;
        }
        self.special.epc = self.special.pc;
        self.special.pc = EXCEPTION_VECTOR;
        self.error_mode = true;
        self.entry = Entry::Exception;
    }

    /// Undoes the last error-mode entry and resumes in the text region.
    /// An exception pops Status and retries at EPC; a BREAK resumes at the
    /// instruction after it.
    pub fn return_from_exception(&mut self) {
        match self.entry {
            Entry::Exception => {
                self.special.status >>= 4;
                self.special.pc = self.special.epc;
            }
            Entry::Break => self.special.pc = self.special.epc.wrapping_add(4),
        }
        self.entry = Entry::Exception;
        self.error_mode = false;
    }

    pub fn entry(&self) -> Entry {
        self.entry
    }

    /// 24-bit RGB for palette entry `i`; out-of-range entries are black.
    pub fn palette_entry(&self, i: usize) -> u32 {
        match self.memory.palette.get(i * 3..i * 3 + 3) {
            Some(&[r, g, b]) => (r as u32) << 16 | (g as u32) << 8 | b as u32,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mips::config::UnmappedAccess;
    use crate::mips::encoder::encode;
    use crate::mips::instruction::Instruction;
    use crate::mips::loader::load_words;
    use crate::mips::syscall::{BufferedConsole, SyscallOutcome, SyscallRequest};

    fn with_code(code: &[Instruction]) -> Machine {
        let mut m = Machine::new(MachineConfig::compact());
        let words: Vec<u32> = code.iter().map(encode).collect();
        load_words(&mut m.memory, TEXT_BASE, &words).unwrap();
        m
    }

    #[test]
    fn reset_state() {
        let m = Machine::new(MachineConfig::compact());
        assert_eq!(m.special().status, 0xF);
        assert_eq!(m.pc(), 0);
        assert_eq!(m.registers().get(REG_SP), STACK_BASE + 0x1000 - 4);
        assert!(!m.error_mode());
    }

    #[test]
    fn overflow_enters_exception_handler() {
        let mut m = with_code(&[
            Instruction::i(OPC_LUI, 8, 0, 0x7FFF),
            Instruction::i(OPC_ORI, 8, 8, 0xFFFF),
            Instruction::i(OPC_ADDI, 9, 8, 1),
        ]);
        let mut con = BufferedConsole::new();
        assert_eq!(m.clock(&mut con), Tick::Retired);
        assert_eq!(m.clock(&mut con), Tick::Retired);
        assert_eq!(m.clock(&mut con), Tick::Trapped(Cause::Overflow));
        assert_eq!(m.special().epc, 8);
        assert_eq!(m.special().cause, 2 << 2);
        assert_eq!(m.special().status, 0xF0);
        assert_eq!(m.pc(), EXCEPTION_VECTOR);
        assert_eq!(m.code_region(), Region::ErrorRom);
        assert_eq!(m.registers().get(9), 0);

        m.return_from_exception();
        assert_eq!((m.pc(), m.special().status, m.error_mode()), (8, 0xF, false));
    }

    #[test]
    fn return_from_break_keeps_status_and_steps_past() {
        let mut m = with_code(&[
            Instruction::r(FN_BREAK, 0, 0, 0),
            Instruction::i(OPC_ADDIU, 8, 0, 1),
        ]);
        let mut con = BufferedConsole::new();
        m.clock(&mut con);
        assert_eq!((m.pc(), m.entry(), m.error_mode()), (BREAK_VECTOR, Entry::Break, true));

        m.return_from_exception();
        assert_eq!((m.pc(), m.special().status, m.error_mode()), (4, 0xF, false));
        assert_eq!(m.clock(&mut con), Tick::Retired);
        assert_eq!(m.registers().get(8), 1);
        assert_eq!(m.pc(), 8);
    }

    #[test]
    fn error_rom_code_runs_after_exception() {
        let mut m = with_code(&[Instruction::r(0x01, 0, 0, 0)]);
        let handler = encode(&Instruction::i(OPC_ADDIU, 26, 0, 0x77));
        load_words(&mut m.memory, ERROR_ROM_BASE + EXCEPTION_VECTOR, &[handler]).unwrap();
        let mut con = BufferedConsole::new();
        assert_eq!(m.clock(&mut con), Tick::Trapped(Cause::InstructionBus));
        assert_eq!(m.clock(&mut con), Tick::Retired);
        assert_eq!(m.registers().get(26), 0x77);
    }

    #[test]
    fn bus_error_sets_bvr() {
        let cfg = MachineConfig { unmapped: UnmappedAccess::BusError, ..MachineConfig::compact() };
        let mut m = Machine::new(cfg);
        load_words(&mut m.memory, TEXT_BASE, &[encode(&Instruction::i(OPC_LW, 8, 0, 0x10))]).unwrap();
        assert_eq!(m.clock(&mut BufferedConsole::new()), Tick::Trapped(Cause::InstructionBus));
        assert_eq!(m.special().bvr, 0x10);
        assert_eq!(m.special().cause, 1 << 2);
    }

    #[test]
    fn fetch_past_text_end_is_bus_error() {
        let mut m = Machine::new(MachineConfig::compact());
        let end = m.memory().text.len() as u32;
        m.set_pc(end);
        assert_eq!(m.clock(&mut BufferedConsole::new()), Tick::Trapped(Cause::InstructionBus));
        assert_eq!(m.special().bvr, TEXT_BASE + end);
        assert_eq!(m.special().epc, end);
    }

    #[test]
    fn interrupt_lines_are_recorded_in_cause() {
        let mut m = with_code(&[Instruction::shift(FN_SLL, 0, 0, 0)]);
        m.set_interrupt_lines(0b101);
        assert_eq!(m.clock(&mut BufferedConsole::new()), Tick::Trapped(Cause::Interrupt));
        assert_eq!(m.special().cause, 0b101 << 9);
        m.return_from_exception();
        // interrupts masked
        m.special_mut().status = 0;
        assert_eq!(m.clock(&mut BufferedConsole::new()), Tick::Retired);
    }

    #[test]
    fn suspend_reexecutes_syscall_after_resume() {
        let mut m = with_code(&[
            Instruction::i(OPC_ADDIU, REG_V0, 0, 5),
            Instruction::r(FN_SYSCALL, 0, 0, 0),
        ]);
        let mut calls = 0;
        let mut host = |_: SyscallRequest, _: &mut Machine| {
            calls += 1;
            if calls == 1 { SyscallOutcome::Suspend } else { SyscallOutcome::Stop }
        };
        assert_eq!(m.run(&mut host, 10), 2);
        assert!(m.is_paused());
        assert_eq!(m.pc(), 4);
        assert_eq!(m.clock(&mut host), Tick::Idle);

        m.resume();
        assert_eq!(m.run(&mut host, 10), 1);
        assert!(m.is_stopped());
        assert_eq!(m.pc(), 8);
    }

    #[test]
    fn toggle_flips_pause() {
        let mut m = Machine::default();
        assert!(m.toggle());
        assert!(m.is_paused());
        assert!(!m.toggle());
    }

    #[test]
    fn palette_lookup() {
        let mut m = Machine::new(MachineConfig::compact());
        m.memory_mut().palette[3..6].copy_from_slice(&[0x12, 0x34, 0x56]);
        assert_eq!(m.palette_entry(1), 0x12_3456);
        assert_eq!(m.palette_entry(PALETTE_ENTRIES), 0);
    }
}
