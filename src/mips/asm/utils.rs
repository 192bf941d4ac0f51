use crate::mips::registers::{REGISTER_COUNT, reg_index};

/// Strips `#` comments (outside string literals) and blank lines,
/// keeping the zero-based source line number.
pub(crate) fn preprocess(text: &str) -> Vec<(usize, String)> {
    text.lines()
        .enumerate()
        .map(|(i, l)| (i, strip_comment(l).trim().to_string()))
        .filter(|(_, l)| !l.is_empty())
        .collect()
}

fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            '#' if !quoted => return &line[..i],
            _ => {}
        }
    }
    line
}

fn is_label_name(s: &str) -> bool {
    let name = s.strip_prefix('.').unwrap_or(s);
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Peels leading `name:` definitions off a line.
pub(crate) fn split_labels(mut line: &str) -> (Vec<String>, &str) {
    let mut labels = Vec::new();
    while let Some((head, rest)) = line.split_once(':') {
        let head = head.trim();
        if !is_label_name(head) {
            break;
        }
        labels.push(head.strip_prefix('.').unwrap_or(head).to_string());
        line = rest.trim_start();
    }
    (labels, line)
}

/// `"addi $t0, $t1, 4"` → `("addi", "$t0, $t1, 4")`.
pub(crate) fn split_mnemonic(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((m, rest)) => (m, rest.trim()),
        None => (line, ""),
    }
}

/// Splits on commas that are not inside a string literal.
pub(crate) fn split_operands(rest: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut quoted = false;
    let mut escaped = false;
    for c in rest.chars() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ',' if !quoted => {
                out.push(cur.trim().to_string());
                cur.clear();
                continue;
            }
            _ => {}
        }
        cur.push(c);
    }
    if !cur.trim().is_empty() || !out.is_empty() {
        out.push(cur.trim().to_string());
    }
    out
}

/// `$t0`, `$8`, `$s8` (alias of `$fp`).
pub(crate) fn parse_reg(s: &str) -> Option<u8> {
    let name = s.trim().strip_prefix('$')?.to_ascii_lowercase();
    if let Ok(n) = name.parse::<u8>() {
        return ((n as usize) < REGISTER_COUNT).then_some(n);
    }
    match name.as_str() {
        "s8" => Some(30),
        _ => reg_index(&name),
    }
}

/// Decimal, `0x` hex, `0b` binary (optionally negative) or a `'c'` character.
pub(crate) fn parse_imm(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        let bytes = unescape(inner)?;
        return match bytes.as_slice() {
            [b] => Some(*b as i64),
            _ => None,
        };
    }
    let (neg, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let lower = body.to_ascii_lowercase();
    let v = if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()?
    } else {
        lower.parse::<i64>().ok()?
    };
    Some(if neg { -v } else { v })
}

fn unescape(s: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        out.push(match chars.next()? {
            'n' => b'\n',
            't' => b'\t',
            'r' => b'\r',
            '0' => 0,
            '\\' => b'\\',
            '"' => b'"',
            '\'' => b'\'',
            _ => return None,
        });
    }
    Some(out)
}

/// A double-quoted string literal with C-style escapes.
pub(crate) fn parse_str_lit(s: &str) -> Option<Vec<u8>> {
    let s = s.trim();
    let inner = s.strip_prefix('"')?.strip_suffix('"')?;
    unescape(inner)
}

/// `imm($base)` → `("imm", "$base")`; a bare `($base)` has an empty offset.
pub(crate) fn parse_memop(op: &str) -> Option<(&str, &str)> {
    let (imm, rest) = op.split_once('(')?;
    let base = rest.trim().strip_suffix(')')?;
    Some((imm.trim(), base.trim()))
}

/// `%hi(sym)` / `%lo(sym)` operands.
pub(crate) fn parse_reloc(s: &str) -> Option<(bool, &str)> {
    let s = s.trim();
    let (hi, rest) = if let Some(r) = s.strip_prefix("%hi(") {
        (true, r)
    } else {
        (false, s.strip_prefix("%lo(")?)
    };
    Some((hi, rest.strip_suffix(')')?.trim()))
}
