use crate::mips::{errors::Result, memory::Bus};

/// Loads instruction words at `base`, contiguously, big-endian.
pub fn load_words(mem: &mut impl Bus, base: u32, code: &[u32]) -> Result<()> {
    let mut addr = base;
    for &w in code {
        load_bytes(mem, addr, &w.to_be_bytes())?;
        addr = addr.wrapping_add(4);
    }
    Ok(())
}

/// Loads raw bytes at `base`.
pub fn load_bytes(mem: &mut impl Bus, base: u32, bytes: &[u8]) -> Result<()> {
    let mut addr = base;
    for &b in bytes {
        mem.store8(addr, b)?;
        addr = addr.wrapping_add(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mips::arch::{RAM_BASE, TEXT_BASE};
    use crate::mips::config::MachineConfig;
    use crate::mips::errors::MipsError;
    use crate::mips::memory::Memory;

    #[test]
    fn words_land_big_endian_in_text() {
        let mut mem = Memory::new(&MachineConfig::compact());
        load_words(&mut mem, TEXT_BASE + 8, &[0x0109_5020]).unwrap();
        assert_eq!(mem.text[8..12], [0x01, 0x09, 0x50, 0x20]);
    }

    #[test]
    fn overflowing_load_reports_bus_error() {
        let mut mem = Memory::new(&MachineConfig::compact());
        let last = RAM_BASE + mem.ram.len() as u32 - 1;
        let err = load_bytes(&mut mem, last, &[1, 2]).unwrap_err();
        assert!(matches!(err, MipsError::Bus { addr } if addr == last + 1));
    }
}
