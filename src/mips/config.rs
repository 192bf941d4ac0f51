use serde::{Deserialize, Serialize};

use super::errors::Result;

/// What DIV/DIVU do with a zero divisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivideByZero {
    /// HI/LO keep their previous values and execution continues.
    #[default]
    Ignore,
    /// Raise the OVERFLOW exception.
    Overflow,
}

/// What happens on accesses below the lowest mapped window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedAccess {
    /// Reads return zero, writes are dropped.
    #[default]
    ReadZero,
    /// Treated like any other bus error.
    BusError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub ram_size: usize,
    pub text_size: usize,
    pub stack_size: usize,
    pub error_rom_size: usize,
    pub vram_size: usize,
    pub initial_pc: u32,
    pub initial_status: u32,
    pub divide_by_zero: DivideByZero,
    pub unmapped: UnmappedAccess,
    /// Point `$sp` at the last word of the stack window on reset.
    pub init_stack_pointer: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            ram_size: 0x20_0000,
            text_size: 0x100_0000,
            stack_size: 0x80_0000,
            error_rom_size: 0x80_0000,
            vram_size: 0x4_0000,
            initial_pc: 0,
            initial_status: 0xF,
            divide_by_zero: DivideByZero::default(),
            unmapped: UnmappedAccess::default(),
            init_stack_pointer: true,
        }
    }
}

impl MachineConfig {
    /// Small regions, handy for tests and snapshots.
    pub fn compact() -> Self {
        Self {
            ram_size: 0x2_0000,
            text_size: 0x1_0000,
            stack_size: 0x1000,
            error_rom_size: 0x1000,
            vram_size: 0x1000,
            ..Self::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg = MachineConfig::from_json(r#"{ "ram_size": 4096, "divide_by_zero": "overflow" }"#)
            .unwrap();
        assert_eq!(cfg.ram_size, 4096);
        assert_eq!(cfg.divide_by_zero, DivideByZero::Overflow);
        assert_eq!(cfg.text_size, MachineConfig::default().text_size);
        assert_eq!(cfg.unmapped, UnmappedAccess::ReadZero);
    }
}
