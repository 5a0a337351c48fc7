//! The single error type shared by every stage of the bitstream pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::codec::Compression;

#[derive(Error, Debug)]
pub enum BitstatError {
    // =========================================================================
    // === Input Errors
    // =========================================================================
    /// A character other than '0' or '1' in a bit-string input. Readers skip
    /// the offending unit and keep going.
    #[error("invalid bit {}", describe_unit(.0))]
    InvalidBit(u8),

    #[error("data cap `{0}` is not valid")]
    InvalidDataCap(String),

    // =========================================================================
    // === Codec Errors
    // =========================================================================
    #[error("compression algorithm {0} is not implemented")]
    UnsupportedCompression(Compression),

    #[error("{codec} stream could not be decoded: {source}")]
    DecodeError {
        codec: Compression,
        #[source]
        source: io::Error,
    },

    #[error("{codec} compression failed: {source}")]
    EncodeError {
        codec: Compression,
        #[source]
        source: io::Error,
    },

    // =========================================================================
    // === Window / Configuration Errors
    // =========================================================================
    /// Returned by `BitWindow::slide_by` when the window would run past the
    /// end of the sequence. Iterating callers stop on it.
    #[error("end of bit sequence")]
    EndOfSequence,

    #[error("window of {0} bits is not supported (must be between 1 and 64)")]
    UnsupportedWindowSize(usize),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    // =========================================================================
    // === Wrappers
    // =========================================================================
    #[error("cannot open {}: {source}", path.display())]
    OpenInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("pipeline stage '{stage}' failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<BitstatError>,
    },
}

impl BitstatError {
    /// Wrap `self` with the name of the pipeline stage it escaped from.
    pub fn in_stage(self, stage: &'static str) -> Self {
        BitstatError::Stage {
            stage,
            source: Box::new(self),
        }
    }
}

/// ASCII units print as a quoted char, other bytes as hex.
fn describe_unit(unit: &u8) -> String {
    if unit.is_ascii() {
        format!("{:?}", *unit as char)
    } else {
        format!("{unit:#04x}")
    }
}
