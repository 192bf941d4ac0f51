use super::utils::parse_imm;

/// A real mnemonic with its textual operands.
pub(crate) type Line = (&'static str, Vec<String>);

const AT: &str = "$at";
const ZERO: &str = "$zero";

/// Number of real instructions a mnemonic occupies.
pub(crate) fn width(mnemonic: &str) -> usize {
    match mnemonic {
        "abs" => 3,
        "li" | "la" | "blt" | "bgt" | "bge" | "ble" => 2,
        _ => 1,
    }
}

pub(crate) fn is_pseudo(mnemonic: &str) -> bool {
    matches!(mnemonic, "li" | "la" | "abs" | "move" | "nop" | "blt" | "bgt" | "bge" | "ble")
}

fn arity(mnemonic: &str, ops: &[String], n: usize, shape: &str) -> Result<(), String> {
    if ops.len() == n {
        Ok(())
    } else {
        Err(format!("{mnemonic}: expected '{shape}'"))
    }
}

fn ops(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Expands one pseudo-instruction (lower-case mnemonic) into real ones.
pub(crate) fn expand(mnemonic: &str, o: &[String]) -> Result<Vec<Line>, String> {
    Ok(match mnemonic {
        "nop" => {
            arity(mnemonic, o, 0, "")?;
            vec![("sll", ops(&[ZERO, ZERO, "0"]))]
        }
        "move" => {
            arity(mnemonic, o, 2, "rd, rs")?;
            vec![("add", ops(&[o[0].as_str(), o[1].as_str(), ZERO]))]
        }
        "li" => {
            arity(mnemonic, o, 2, "rd, imm")?;
            let v = parse_imm(o[1].as_str()).ok_or_else(|| format!("li: invalid immediate {}", o[1]))?;
            if !(i32::MIN as i64..=u32::MAX as i64).contains(&v) {
                return Err(format!("li: immediate {v} does not fit 32 bits"));
            }
            let v = v as u32;
            vec![
                ("lui", ops(&[AT, format!("0x{:x}", v >> 16).as_str()])),
                ("ori", ops(&[o[0].as_str(), AT, format!("0x{:x}", v & 0xFFFF).as_str()])),
            ]
        }
        "la" => {
            arity(mnemonic, o, 2, "rd, label")?;
            vec![
                ("lui", ops(&[AT, format!("%hi({})", o[1]).as_str()])),
                ("ori", ops(&[o[0].as_str(), AT, format!("%lo({})", o[1]).as_str()])),
            ]
        }
        "abs" => {
            arity(mnemonic, o, 2, "rd, rs")?;
            vec![
                ("addu", ops(&[o[0].as_str(), o[1].as_str(), ZERO])),
                ("bgez", ops(&[o[1].as_str(), "1"])),
                ("subu", ops(&[o[0].as_str(), ZERO, o[1].as_str()])),
            ]
        }
        "blt" | "bgt" | "bge" | "ble" => {
            arity(mnemonic, o, 3, "rs, rt, label")?;
            // bgt/ble compare with swapped operands
            let (a, b) = if matches!(mnemonic, "blt" | "bge") {
                (o[0].as_str(), o[1].as_str())
            } else {
                (o[1].as_str(), o[0].as_str())
            };
            let branch = if matches!(mnemonic, "blt" | "bgt") { "bne" } else { "beq" };
            vec![("slt", ops(&[AT, a, b])), (branch, ops(&[AT, ZERO, o[2].as_str()]))]
        }
        other => return Err(format!("{other} is not a pseudo-instruction")),
    })
}
