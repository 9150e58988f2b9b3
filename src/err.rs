use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type DumpResult<T> = std::result::Result<T, DumpError>;

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("Failed to open file {}: {source}", path.display())]
    FailedToOpenFile {
        source: io::Error,
        path: PathBuf,
    },

    #[error("Invalid dump header signature, expected `PAGE`, found `{found}`")]
    BadSignature { found: String },

    #[error(
        "Offset 0x{offset:08x}: unexpected end of input while reading {what} (need {need} bytes, have {have})"
    )]
    EndOfInput {
        what: &'static str,
        offset: u64,
        need: usize,
        have: usize,
    },

    #[error("Cannot decode a {width} byte value as an unsigned integer, expected 4 or 8 bytes")]
    UnsupportedIntegerWidth { width: usize },

    #[error("Offset 0x{offset:08x}: an I/O error has occurred: {source}")]
    Io { offset: u64, source: io::Error },
}

impl DumpError {
    pub(crate) fn io(source: io::Error, offset: u64) -> Self {
        DumpError::Io { offset, source }
    }

    /// Offset (absolute, from the start of the dump) at which the error happened, if known.
    pub fn offset(&self) -> Option<u64> {
        match self {
            DumpError::EndOfInput { offset, .. } | DumpError::Io { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}
