use super::arch::*;
use super::config::{MachineConfig, UnmappedAccess};
use super::errors::{MipsError, Result};

/// Backing store selected by the address router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// Memory-mapped I/O stub: a single word that reads as zero.
    Io,
    Palette,
    Video,
    ErrorRom,
    Stack,
    Ram,
    Text,
    /// Anything below the text window.
    Unmapped,
}

/// Maps a virtual address to its region and the offset inside it.
/// Windows are tested from the highest base down.
pub fn route(addr: u32) -> (Region, u32) {
    if addr >= IO_BASE && addr - IO_BASE < 4 {
        (Region::Io, addr - IO_BASE)
    } else if (PALETTE_BASE..PALETTE_BASE + PALETTE_SIZE as u32).contains(&addr) {
        (Region::Palette, addr - PALETTE_BASE)
    } else if addr >= VRAM_BASE {
        (Region::Video, addr - VRAM_BASE)
    } else if addr >= ERROR_ROM_BASE {
        (Region::ErrorRom, addr - ERROR_ROM_BASE)
    } else if addr >= STACK_BASE {
        (Region::Stack, addr - STACK_BASE)
    } else if addr >= RAM_BASE {
        (Region::Ram, addr - RAM_BASE)
    } else if addr >= TEXT_BASE {
        (Region::Text, addr - TEXT_BASE)
    } else {
        (Region::Unmapped, 0)
    }
}

/// Byte/halfword/word access to the emulated address space.
/// Multi-byte values are little-endian.
pub trait Bus {
    fn load8(&self, addr: u32) -> Result<u8>;
    fn load16(&self, addr: u32) -> Result<u16>;
    fn load32(&self, addr: u32) -> Result<u32>;
    fn store8(&mut self, addr: u32, v: u8) -> Result<()>;
    fn store16(&mut self, addr: u32, v: u16) -> Result<()>;
    fn store32(&mut self, addr: u32, v: u32) -> Result<()>;
}

#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    pub ram: Vec<u8>,
    pub text: Vec<u8>,
    pub stack: Vec<u8>,
    pub error_rom: Vec<u8>,
    pub vram: Vec<u8>,
    pub palette: Vec<u8>,
    unmapped: UnmappedAccess,
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("ram", &self.ram.len())
            .field("text", &self.text.len())
            .field("stack", &self.stack.len())
            .field("error_rom", &self.error_rom.len())
            .field("vram", &self.vram.len())
            .field("unmapped", &self.unmapped)
            .finish()
    }
}

impl Memory {
    pub fn new(cfg: &MachineConfig) -> Self {
        Self {
            ram: vec![0; cfg.ram_size],
            text: vec![0; cfg.text_size],
            stack: vec![0; cfg.stack_size],
            error_rom: vec![0; cfg.error_rom_size],
            vram: vec![0; cfg.vram_size],
            palette: vec![0; PALETTE_SIZE],
            unmapped: cfg.unmapped,
        }
    }

    pub fn unmapped_policy(&self) -> UnmappedAccess {
        self.unmapped
    }

    pub fn region(&self, region: Region) -> &[u8] {
        match region {
            Region::Palette => &self.palette,
            Region::Video => &self.vram,
            Region::ErrorRom => &self.error_rom,
            Region::Stack => &self.stack,
            Region::Ram => &self.ram,
            Region::Text => &self.text,
            Region::Io | Region::Unmapped => &[],
        }
    }

    pub fn region_mut(&mut self, region: Region) -> &mut [u8] {
        match region {
            Region::Palette => &mut self.palette,
            Region::Video => &mut self.vram,
            Region::ErrorRom => &mut self.error_rom,
            Region::Stack => &mut self.stack,
            Region::Ram => &mut self.ram,
            Region::Text => &mut self.text,
            Region::Io | Region::Unmapped => &mut [],
        }
    }

    /// Fetches a big-endian instruction word from a code region.
    pub fn fetch(&self, region: Region, offset: u32) -> Option<u32> {
        let off = offset as usize;
        let bytes = self.region(region).get(off..off.checked_add(4)?)?;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read<const N: usize>(&self, addr: u32) -> Result<[u8; N]> {
        match route(addr) {
            (Region::Io, _) => Ok([0; N]),
            (Region::Unmapped, _) if self.unmapped == UnmappedAccess::ReadZero => Ok([0; N]),
            (Region::Unmapped, _) => Err(MipsError::Bus { addr }),
            (region, off) => {
                let off = off as usize;
                self.region(region)
                    .get(off..off + N)
                    .and_then(|s| s.try_into().ok())
                    .ok_or(MipsError::Bus { addr })
            }
        }
    }

    fn write<const N: usize>(&mut self, addr: u32, bytes: [u8; N]) -> Result<()> {
        match route(addr) {
            (Region::Io, _) => Ok(()),
            (Region::Unmapped, _) if self.unmapped == UnmappedAccess::ReadZero => Ok(()),
            (Region::Unmapped, _) => Err(MipsError::Bus { addr }),
            (region, off) => {
                let off = off as usize;
                let dst = self
                    .region_mut(region)
                    .get_mut(off..off + N)
                    .ok_or(MipsError::Bus { addr })?;
                dst.copy_from_slice(&bytes);
                Ok(())
            }
        }
    }
}

impl Bus for Memory {
    fn load8(&self, addr: u32) -> Result<u8> {
        Ok(self.read::<1>(addr)?[0])
    }
    fn load16(&self, addr: u32) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read(addr)?))
    }
    fn load32(&self, addr: u32) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read(addr)?))
    }
    fn store8(&mut self, addr: u32, v: u8) -> Result<()> {
        self.write(addr, [v])
    }
    fn store16(&mut self, addr: u32, v: u16) -> Result<()> {
        self.write(addr, v.to_le_bytes())
    }
    fn store32(&mut self, addr: u32, v: u32) -> Result<()> {
        self.write(addr, v.to_le_bytes())
    }
}
