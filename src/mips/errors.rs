use thiserror::Error;

/// Host-level errors raised by the emulator and its loaders.
///
/// Architectural faults of the emulated CPU are not reported here; they
/// land in the Cause/EPC/Status registers instead.
#[derive(Error, Debug)]
pub enum MipsError {
    /// Fewer than four bytes were handed to the decoder.
    #[error("cannot decode an instruction from a {} bit buffer; at least 32 bits are required", .len * 8)]
    ShortBuffer { len: usize },

    /// Access outside any backing region.
    #[error("bus error at 0x{addr:08x}")]
    Bus { addr: u32 },

    /// A program or image does not fit its target region.
    #[error("cannot load {what}: {len} bytes at offset 0x{offset:x} exceed region size 0x{size:x}")]
    Load {
        what: &'static str,
        offset: u32,
        len: usize,
        size: usize,
    },

    #[error("invalid snapshot: {0}")]
    Snapshot(String),

    /// Malformed snapshot JSON, including bad base64 in a region image.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MipsError>;
