use super::utils::{parse_imm, parse_str_lit, split_operands};

/// One `.word` entry: a literal or a label resolved in the second pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WordValue {
    Lit(u32),
    Sym(String),
}

/// Content contributed by one data directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DataItem {
    Bytes(Vec<u8>),
    Words(Vec<WordValue>),
    Zeros(u32),
}

impl DataItem {
    pub(crate) fn size(&self) -> u32 {
        match self {
            DataItem::Bytes(b) => b.len() as u32,
            DataItem::Words(w) => 4 * w.len() as u32,
            DataItem::Zeros(n) => *n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Directive {
    Text,
    Data,
    /// `.globl` and friends.
    Ignored,
    Item(DataItem),
    /// Alignment as a power of two.
    Align(u32),
}

impl Directive {
    pub(crate) fn is_data(&self) -> bool {
        matches!(self, Directive::Item(_) | Directive::Align(_))
    }
}

/// Largest data segment the assembler lays out, and so the largest
/// single `.space` reservation.
pub(crate) const MAX_DATA_SIZE: u32 = 0x100_0000;

fn ranged(tok: &str, min: i64, max: i64, what: &str) -> Result<i64, String> {
    let v = parse_imm(tok).ok_or_else(|| format!("invalid {what} value: {tok}"))?;
    if (min..=max).contains(&v) {
        Ok(v)
    } else {
        Err(format!("{what} value {v} outside {min}..={max}"))
    }
}

fn list(rest: &str, what: &str) -> Result<Vec<String>, String> {
    let ops = split_operands(rest);
    if ops.is_empty() || ops.iter().any(|o| o.is_empty()) {
        return Err(format!("{what}: expected a comma separated list"));
    }
    Ok(ops)
}

fn is_symbol(tok: &str) -> bool {
    let mut chars = tok.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Parses `.name rest`; `name` is given without the leading dot.
pub(crate) fn parse_directive(name: &str, rest: &str) -> Result<Directive, String> {
    let item = match name.to_ascii_lowercase().as_str() {
        "text" => return Ok(Directive::Text),
        "data" => return Ok(Directive::Data),
        "globl" | "global" | "extern" => return Ok(Directive::Ignored),
        "align" => {
            let n = ranged(rest, 0, 15, ".align")?;
            return Ok(Directive::Align(n as u32));
        }
        "space" => DataItem::Zeros(ranged(rest, 0, MAX_DATA_SIZE as i64, ".space")? as u32),
        "ascii" | "asciiz" => {
            let mut bytes = parse_str_lit(rest).ok_or_else(|| format!("invalid string literal: {rest}"))?;
            if name.eq_ignore_ascii_case("asciiz") {
                bytes.push(0);
            }
            DataItem::Bytes(bytes)
        }
        "byte" => DataItem::Bytes(
            list(rest, ".byte")?
                .iter()
                .map(|t| ranged(t, i8::MIN as i64, u8::MAX as i64, ".byte").map(|v| v as u8))
                .collect::<Result<_, _>>()?,
        ),
        "hword" | "half" => {
            let mut bytes = Vec::new();
            for t in list(rest, ".hword")? {
                let v = ranged(&t, i16::MIN as i64, u16::MAX as i64, ".hword")?;
                bytes.extend_from_slice(&(v as u16).to_le_bytes());
            }
            DataItem::Bytes(bytes)
        }
        "word" => DataItem::Words(
            list(rest, ".word")?
                .into_iter()
                .map(|t| match parse_imm(&t) {
                    Some(v) if (i32::MIN as i64..=u32::MAX as i64).contains(&v) => Ok(WordValue::Lit(v as u32)),
                    Some(v) => Err(format!(".word value {v} does not fit 32 bits")),
                    None if is_symbol(&t) => Ok(WordValue::Sym(t)),
                    None => Err(format!("invalid .word value: {t}")),
                })
                .collect::<Result<_, _>>()?,
        ),
        other => return Err(format!("unknown directive .{other}")),
    };
    Ok(Directive::Item(item))
}
