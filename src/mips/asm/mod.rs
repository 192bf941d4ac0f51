// src/mips/asm/mod.rs
mod compiler;
mod data;
mod errors;
mod program;
mod pseudo;
mod utils;

#[cfg(test)]
mod tests;

use std::collections::HashMap;

use crate::mips::{
    arch::*,
    encoder::encode,
    errors::{MipsError, Result},
    loader::{load_bytes, load_words},
    machine::Machine,
};

use compiler::{Ctx, compile};
use data::{DataItem, Directive, MAX_DATA_SIZE, WordValue, parse_directive};
use utils::{preprocess, split_labels, split_mnemonic, split_operands};

pub use errors::AsmError;
pub use program::{DataBlock, Program, Reloc, Symbol};

enum Mode {
    Text,
    Data,
}

/// A real instruction waiting for the second pass. `None` marks a slot
/// whose pseudo-instruction could not be expanded; it assembles to zero.
struct TextItem {
    line: usize,
    pc: u32,
    inst: Option<(String, Vec<String>)>,
}

/// Data block as laid out by the first pass.
struct DataDraft {
    name: Option<String>,
    offset: u32,
    size: u32,
    items: Vec<(usize, DataItem)>,
}

impl DataDraft {
    // offset + size never exceeds MAX_DATA_SIZE
    fn end(&self) -> u32 {
        self.offset + self.size
    }
}

/// `cursor + size` if the data segment still fits.
fn grow(cursor: u32, size: u32) -> Option<u32> {
    cursor.checked_add(size).filter(|end| *end <= MAX_DATA_SIZE)
}

struct Layout {
    items: Vec<TextItem>,
    drafts: Vec<DataDraft>,
    symbols: HashMap<String, Symbol>,
}

/// Two-pass assembler; every diagnostic goes to `on_error` and assembly
/// always runs to the end of the source.
pub struct Assembler<E: FnMut(AsmError)> {
    on_error: E,
    errors: usize,
}

impl<E: FnMut(AsmError)> Assembler<E> {
    pub fn new(on_error: E) -> Self {
        Assembler { on_error, errors: 0 }
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    fn report(&mut self, line: usize, msg: impl Into<String>) {
        self.errors += 1;
        (self.on_error)(AsmError::new(line, msg));
    }

    pub fn assemble(&mut self, source: &str) -> Program {
        let lines = preprocess(source);
        let layout = self.first_pass(&lines);
        let prog = self.second_pass(layout);
        log::debug!(
            "assembled {} words, {} data blocks, {} errors",
            prog.text.len(),
            prog.data.len(),
            self.errors
        );
        prog
    }

    /// Assigns text offsets and data offsets to every label, expanding
    /// pseudo-instructions and parsing data directives on the way.
    fn first_pass(&mut self, lines: &[(usize, String)]) -> Layout {
        let mut mode = Mode::Text;
        let mut pc = 0u32;
        let mut cursor = 0u32;
        let mut items = Vec::new();
        let mut drafts: Vec<DataDraft> = Vec::new();
        let mut symbols = HashMap::new();

        for (line_no, raw) in lines {
            let line = *line_no;
            let (labels, rest) = split_labels(raw);
            for name in labels {
                if symbols.contains_key(&name) {
                    self.report(line, format!("duplicate label: {name}"));
                    continue;
                }
                let sym = match mode {
                    Mode::Text => Symbol::Text(pc),
                    Mode::Data => {
                        drafts.push(DataDraft { name: Some(name.clone()), offset: cursor, size: 0, items: Vec::new() });
                        Symbol::Data(cursor)
                    }
                };
                symbols.insert(name, sym);
            }
            if rest.is_empty() {
                continue;
            }

            if let Some(directive) = rest.strip_prefix('.') {
                let (name, args) = split_mnemonic(directive);
                let directive = match parse_directive(name, args) {
                    Ok(d) => d,
                    Err(msg) => {
                        self.report(line, msg);
                        continue;
                    }
                };
                if directive.is_data() && matches!(mode, Mode::Text) {
                    self.report(line, format!(".{name} is only valid in the .data section"));
                    continue;
                }
                // data goes into the block ending at the cursor, or a fresh one
                let open = drafts.last_mut().filter(|d| d.end() == cursor);
                match directive {
                    Directive::Text => mode = Mode::Text,
                    Directive::Data => mode = Mode::Data,
                    Directive::Ignored => {}
                    Directive::Align(n) => {
                        let align = 1u32 << n;
                        let pad = (align - cursor % align) % align;
                        let Some(end) = grow(cursor, pad) else {
                            self.report(line, format!("data segment exceeds {MAX_DATA_SIZE:#x} bytes"));
                            continue;
                        };
                        if let Some(d) = open.filter(|_| pad > 0) {
                            d.items.push((line, DataItem::Zeros(pad)));
                            d.size += pad;
                        }
                        cursor = end;
                    }
                    Directive::Item(item) => {
                        let size = item.size();
                        let Some(end) = grow(cursor, size) else {
                            self.report(line, format!("data segment exceeds {MAX_DATA_SIZE:#x} bytes"));
                            continue;
                        };
                        match open {
                            Some(d) => {
                                d.items.push((line, item));
                                d.size += size;
                            }
                            None => drafts.push(DataDraft { name: None, offset: cursor, size, items: vec![(line, item)] }),
                        }
                        cursor = end;
                    }
                }
                continue;
            }

            if let Mode::Data = mode {
                self.report(line, format!("instruction in .data section: {rest}"));
                continue;
            }
            let (mnemonic, args) = split_mnemonic(rest);
            let mnemonic = mnemonic.to_ascii_lowercase();
            let ops = split_operands(args);
            let expanded: Vec<Option<(String, Vec<String>)>> = if pseudo::is_pseudo(&mnemonic) {
                match pseudo::expand(&mnemonic, &ops) {
                    Ok(real) => real.into_iter().map(|(m, o)| Some((m.to_string(), o))).collect(),
                    Err(msg) => {
                        self.report(line, msg);
                        vec![None; pseudo::width(&mnemonic)]
                    }
                }
            } else {
                vec![Some((mnemonic, ops))]
            };
            for inst in expanded {
                items.push(TextItem { line, pc, inst });
                pc = pc.wrapping_add(4);
            }
        }

        Layout { items, drafts, symbols }
    }

    /// Encodes instructions and materializes data blocks with all labels known.
    fn second_pass(&mut self, layout: Layout) -> Program {
        let Layout { items, drafts, symbols } = layout;
        let mut text = Vec::with_capacity(items.len());
        let mut source_lines = Vec::with_capacity(items.len());
        let mut relocs = Vec::new();

        for item in items {
            let word = match item.inst {
                None => 0,
                Some((mnemonic, ops)) => {
                    let mut ctx = Ctx::new(&symbols, item.pc);
                    let res = compile(&mnemonic, &ops, &mut ctx);
                    for msg in ctx.soft {
                        self.report(item.line, msg);
                    }
                    let index = text.len();
                    match ctx.text_ref {
                        Some((true, target)) => relocs.push(Reloc::Hi { index, target }),
                        Some((false, target)) => relocs.push(Reloc::Lo { index, target }),
                        None => {}
                    }
                    match res {
                        Ok(inst) if inst.is_valid() => encode(&inst),
                        Ok(inst) => {
                            self.report(item.line, format!("field out of range in {inst:?}"));
                            0
                        }
                        Err(msg) => {
                            self.report(item.line, msg);
                            0
                        }
                    }
                }
            };
            text.push(word);
            source_lines.push(item.line);
        }

        let mut data = Vec::with_capacity(drafts.len());
        for (block, draft) in drafts.into_iter().enumerate() {
            let mut bytes = Vec::with_capacity(draft.size as usize);
            for (line, item) in draft.items {
                match item {
                    DataItem::Bytes(b) => bytes.extend_from_slice(&b),
                    DataItem::Zeros(n) => bytes.resize(bytes.len() + n as usize, 0),
                    DataItem::Words(words) => {
                        for w in words {
                            let v = match w {
                                WordValue::Lit(v) => v,
                                WordValue::Sym(name) => match symbols.get(&name) {
                                    Some(&Symbol::Text(target)) => {
                                        relocs.push(Reloc::Word { block, offset: bytes.len(), target });
                                        target
                                    }
                                    Some(sym) => sym.address(),
                                    None => {
                                        self.report(line, format!("label not found: {name}"));
                                        0
                                    }
                                },
                            };
                            bytes.extend_from_slice(&v.to_le_bytes());
                        }
                    }
                }
            }
            data.push(DataBlock { name: draft.name, offset: draft.offset, bytes });
        }

        Program { text, source_lines, data, symbols, relocs }
    }
}

/// Assembles `source`, handing every diagnostic to `on_error`.
pub fn assemble_with(source: &str, on_error: impl FnMut(AsmError)) -> Program {
    Assembler::new(on_error).assemble(source)
}

/// Assembles `source`, failing with every diagnostic if there was any.
pub fn assemble(source: &str) -> std::result::Result<Program, Vec<AsmError>> {
    let mut errors = Vec::new();
    let prog = assemble_with(source, |e| errors.push(e));
    if errors.is_empty() { Ok(prog) } else { Err(errors) }
}

fn relocate(word: u32, page_base: u32) -> u32 {
    let opcode = (word >> 26) as u8;
    if opcode == OPC_J || opcode == OPC_JAL {
        (word & 0xFC00_0000) | (word.wrapping_add(page_base >> 2) & 0x03FF_FFFF)
    } else {
        word
    }
}

fn set_imm16(word: u32, imm: u32) -> u32 {
    (word & 0xFFFF_0000) | (imm & 0xFFFF)
}

impl Program {
    /// Writes the program into `machine`: instructions at `page * 0x80000`
    /// in the text region (jump targets and text-label addresses rebased
    /// onto the page), data blocks into RAM at the data segment. Returns
    /// the entry offset.
    pub fn load_in_machine(&self, machine: &mut Machine, page: u32) -> Result<u32> {
        let text_len = self.text.len() * 4;
        let mem = machine.memory_mut();
        let base = page
            .checked_mul(TEXT_PAGE_SIZE)
            .filter(|b| *b as usize + text_len <= mem.text.len())
            .ok_or(MipsError::Load {
                what: "text",
                offset: page.wrapping_mul(TEXT_PAGE_SIZE),
                len: text_len,
                size: mem.text.len(),
            })?;
        let mut words: Vec<u32> = self.text.iter().map(|&w| relocate(w, base)).collect();
        let mut data: Vec<Vec<u8>> = self.data.iter().map(|b| b.bytes.clone()).collect();
        for reloc in &self.relocs {
            match *reloc {
                Reloc::Hi { index, target } => {
                    if let Some(w) = words.get_mut(index) {
                        *w = set_imm16(*w, target.wrapping_add(base) >> 16);
                    }
                }
                Reloc::Lo { index, target } => {
                    if let Some(w) = words.get_mut(index) {
                        *w = set_imm16(*w, target.wrapping_add(base));
                    }
                }
                Reloc::Word { block, offset, target } => {
                    if let Some(slot) = data.get_mut(block).and_then(|b| b.get_mut(offset..offset + 4)) {
                        slot.copy_from_slice(&target.wrapping_add(base).to_le_bytes());
                    }
                }
            }
        }
        load_words(mem, TEXT_BASE + base, &words)?;

        for (block, bytes) in self.data.iter().zip(&data) {
            let offset = (DATA_SEGMENT_BASE - RAM_BASE) as usize + block.offset as usize;
            if offset + bytes.len() > mem.ram.len() {
                return Err(MipsError::Load {
                    what: "data",
                    offset: block.address().wrapping_sub(RAM_BASE),
                    len: bytes.len(),
                    size: mem.ram.len(),
                });
            }
            load_bytes(mem, block.address(), bytes)?;
        }
        log::debug!(
            "loaded {} words at text offset 0x{:x}, {} data bytes, {} relocations",
            words.len(),
            base,
            self.data_size(),
            self.relocs.len()
        );
        Ok(base + self.entry())
    }
}
