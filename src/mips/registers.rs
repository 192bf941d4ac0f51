// mips/registers.rs
use serde::{Deserialize, Serialize};

pub const REGISTER_COUNT: usize = 32;

/// Symbolic names, indexed by register number.
pub const REGISTER_NAMES: [&str; REGISTER_COUNT] = [
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", //
    "t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7", //
    "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", //
    "t8", "t9", "k0", "k1", "gp", "sp", "fp", "ra",
];

pub fn reg_name(r: u8) -> &'static str {
    REGISTER_NAMES.get(r as usize).copied().unwrap_or("?")
}

pub fn reg_index(name: &str) -> Option<u8> {
    REGISTER_NAMES.iter().position(|n| *n == name).map(|i| i as u8)
}

/// General purpose registers. `$0` reads as zero and ignores writes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    x: [u32; REGISTER_COUNT],
}

impl RegisterFile {
    pub fn from_words(words: [u32; REGISTER_COUNT]) -> Self {
        let mut regs = Self { x: words };
        regs.x[0] = 0;
        regs
    }

    #[inline]
    pub fn get(&self, r: u8) -> u32 {
        if r == 0 { 0 } else { self.x[(r & 0x1F) as usize] }
    }

    #[inline]
    pub fn set(&mut self, r: u8, v: u32) {
        if r != 0 {
            self.x[(r & 0x1F) as usize] = v;
        }
    }

    pub fn words(&self) -> &[u32; REGISTER_COUNT] {
        &self.x
    }
}

/// Special registers outside the general register file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialRegisters {
    /// Next fetch offset inside the active code region.
    pub pc: u32,
    pub epc: u32,
    pub cause: u32,
    pub hi: u32,
    pub lo: u32,
    /// Interrupt-enable stack, pushed four bits per exception.
    pub status: u32,
    /// Bad address captured on the last bus error.
    pub bvr: u32,
}
