use std::fmt;

/// One assembler diagnostic; `line` is zero-based, displayed one-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmError {
    pub line: usize,
    pub msg: String,
}

impl AsmError {
    pub fn new(line: usize, msg: impl Into<String>) -> Self {
        AsmError { line, msg: msg.into() }
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line + 1, self.msg)
    }
}

impl std::error::Error for AsmError {}
