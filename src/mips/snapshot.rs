use serde::{Deserialize, Serialize};

use crate::mips::{
    arch::PALETTE_SIZE,
    config::MachineConfig,
    errors::{MipsError, Result},
    machine::{Entry, Machine},
    memory::Memory,
    registers::{REGISTER_COUNT, RegisterFile, SpecialRegisters},
};

pub const SNAPSHOT_VERSION: u32 = 1;

/// Region images travel as standard base64 strings.
mod b64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(d)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}

/// Whole-machine state, restorable into an identical machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub config: MachineConfig,
    pub special: SpecialRegisters,
    pub registers: Vec<u32>,
    #[serde(with = "b64")]
    pub ram: Vec<u8>,
    #[serde(with = "b64")]
    pub text: Vec<u8>,
    #[serde(with = "b64")]
    pub error_rom: Vec<u8>,
    #[serde(with = "b64")]
    pub stack: Vec<u8>,
    #[serde(with = "b64")]
    pub vram: Vec<u8>,
    #[serde(with = "b64")]
    pub palette: Vec<u8>,
    pub error_mode: bool,
    #[serde(default)]
    pub entry: Entry,
    pub stopped: bool,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub interrupt_lines: u32,
    /// Console input fed to the machine but not yet read.
    #[serde(default, with = "b64")]
    pub stdin: Vec<u8>,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Carries pending console input along with the machine, so a
    /// machine suspended mid-read resumes with the same buffered bytes.
    pub fn with_input(mut self, pending: &[u8]) -> Self {
        self.stdin = pending.to_vec();
        self
    }

    pub fn input(&self) -> &[u8] {
        &self.stdin
    }

    fn check_len(what: &str, got: usize, expected: usize) -> Result<()> {
        if got == expected {
            Ok(())
        } else {
            Err(MipsError::Snapshot(format!("{what} holds {got} bytes, expected {expected}")))
        }
    }
}

impl Machine {
    pub fn snapshot(&self) -> Snapshot {
        let mem = &self.memory;
        Snapshot {
            version: SNAPSHOT_VERSION,
            config: self.config.clone(),
            special: self.special,
            registers: self.regs.words().to_vec(),
            ram: mem.ram.clone(),
            text: mem.text.clone(),
            error_rom: mem.error_rom.clone(),
            stack: mem.stack.clone(),
            vram: mem.vram.clone(),
            palette: mem.palette.clone(),
            error_mode: self.error_mode,
            entry: self.entry,
            stopped: self.stopped,
            paused: self.paused,
            interrupt_lines: self.interrupt_lines,
            stdin: Vec::new(),
        }
    }

    pub fn from_snapshot(snap: Snapshot) -> Result<Self> {
        if snap.version != SNAPSHOT_VERSION {
            return Err(MipsError::Snapshot(format!("unsupported version {}", snap.version)));
        }
        let cfg = &snap.config;
        Snapshot::check_len("ram", snap.ram.len(), cfg.ram_size)?;
        Snapshot::check_len("text", snap.text.len(), cfg.text_size)?;
        Snapshot::check_len("error_rom", snap.error_rom.len(), cfg.error_rom_size)?;
        Snapshot::check_len("stack", snap.stack.len(), cfg.stack_size)?;
        Snapshot::check_len("vram", snap.vram.len(), cfg.vram_size)?;
        Snapshot::check_len("palette", snap.palette.len(), PALETTE_SIZE)?;
        let words: [u32; REGISTER_COUNT] = snap.registers.as_slice().try_into().map_err(|_| {
            MipsError::Snapshot(format!("{} registers, expected {REGISTER_COUNT}", snap.registers.len()))
        })?;

        let mut memory = Memory::new(&MachineConfig {
            ram_size: 0,
            text_size: 0,
            stack_size: 0,
            error_rom_size: 0,
            vram_size: 0,
            ..snap.config.clone()
        });
        memory.ram = snap.ram;
        memory.text = snap.text;
        memory.error_rom = snap.error_rom;
        memory.stack = snap.stack;
        memory.vram = snap.vram;
        memory.palette = snap.palette;

        Ok(Machine {
            config: snap.config,
            regs: RegisterFile::from_words(words),
            special: snap.special,
            memory,
            error_mode: snap.error_mode,
            entry: snap.entry,
            stopped: snap.stopped,
            paused: snap.paused,
            interrupt_lines: snap.interrupt_lines,
        })
    }
}
