use std::collections::HashMap;

use crate::mips::arch::DATA_SEGMENT_BASE;

/// Where a label points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    /// Byte offset from the start of the instruction stream.
    Text(u32),
    /// Byte offset from the start of the data segment.
    Data(u32),
}

impl Symbol {
    /// Value used by `%hi`/`%lo` and `.word label`.
    pub fn address(self) -> u32 {
        match self {
            Symbol::Text(off) => off,
            Symbol::Data(off) => DATA_SEGMENT_BASE.wrapping_add(off),
        }
    }
}

/// A named, byte-addressed piece of the data segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBlock {
    /// Label that opened the block; `None` for data before any label.
    pub name: Option<String>,
    pub offset: u32,
    pub bytes: Vec<u8>,
}

impl DataBlock {
    pub fn address(&self) -> u32 {
        DATA_SEGMENT_BASE.wrapping_add(self.offset)
    }
}

/// A word holding a text-region address, rebased when the program is
/// placed on a page. `target` is the label's stream offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reloc {
    /// `%hi` immediate of `text[index]`.
    Hi { index: usize, target: u32 },
    /// `%lo` immediate of `text[index]`.
    Lo { index: usize, target: u32 },
    /// Little-endian word at byte `offset` of `data[block]`.
    Word { block: usize, offset: usize, target: u32 },
}

/// Output of the assembler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    /// Encoded instruction words, in stream order.
    pub text: Vec<u32>,
    /// Zero-based source line of every word in `text`.
    pub source_lines: Vec<usize>,
    pub data: Vec<DataBlock>,
    pub symbols: HashMap<String, Symbol>,
    pub relocs: Vec<Reloc>,
}

impl Program {
    /// Offset of `main` if defined, otherwise the start of the stream.
    pub fn entry(&self) -> u32 {
        match self.symbols.get("main") {
            Some(Symbol::Text(off)) => *off,
            _ => 0,
        }
    }

    pub fn data_size(&self) -> u32 {
        self.data
            .iter()
            .map(|b| b.offset + b.bytes.len() as u32)
            .max()
            .unwrap_or(0)
    }
}
