//! The decode/encode entry points.
//!
//! Both run the same stages, differing only in how input is ingested:
//! 1. ingest: raw bytes (`decode`) or '0'/'1' text (`encode`), capped at
//!    `in_max_bits`
//! 2. strip: if an input codec is set, pack the bits to bytes, decompress
//!    them and expand the result back to bits
//! 3. assemble: analyse, apply the output codec and output cap, and build
//!    the report

use std::io::Read;

use log::trace;

use crate::bits::{self, Bit};
use crate::codec::Compression;
use crate::error::BitstatError;
use crate::stats::{self, AnalysisConfig, Report};

/// Configuration for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    /// Stop ingesting after this many bits.
    pub in_max_bits: Option<usize>,
    /// Codec the ingested data is compressed with.
    pub in_compression: Compression,
    /// Truncate the visible output to this many bits, after any output
    /// compression.
    pub out_max_bits: Option<usize>,
    /// Codec applied to the output bits.
    pub out_compression: Compression,
    pub analysis: AnalysisConfig,
}

impl PipelineConfig {
    /// Fail fast on anything that would abort the run later.
    pub fn validate(&self) -> Result<(), BitstatError> {
        self.in_compression.ensure_supported()?;
        self.out_compression.ensure_supported()?;
        self.analysis.validate()
    }
}

/// Read raw bytes and produce the report for their bits.
pub fn decode<R: Read>(reader: R, config: &PipelineConfig) -> Result<Report, BitstatError> {
    config.validate()?;
    let bits = bits::read_bits_from_bytes(reader, config.in_max_bits)
        .map_err(|e| BitstatError::from(e).in_stage("ingest"))?;
    trace!("decode: ingested {} bits", bits.len());
    run(bits, config)
}

/// Read a '0'/'1' character stream and produce the report for its bits.
/// Characters other than '0' and '1' are skipped.
pub fn encode<R: Read>(reader: R, config: &PipelineConfig) -> Result<Report, BitstatError> {
    config.validate()?;
    let bits = bits::read_bits_from_bin_str(reader, config.in_max_bits)
        .map_err(|e| BitstatError::from(e).in_stage("ingest"))?;
    trace!("encode: ingested {} bits", bits.len());
    run(bits, config)
}

/// Run the post-ingestion stages over bits that are already in memory.
pub fn run(bits: Vec<Bit>, config: &PipelineConfig) -> Result<Report, BitstatError> {
    let bits = strip_layer(bits, config.in_compression).map_err(|e| e.in_stage("decompress"))?;
    stats::assemble(
        bits,
        config.out_compression,
        config.out_max_bits,
        &config.analysis,
    )
    .map_err(|e| e.in_stage("assemble"))
}

/// Treat `bits` as the bytes of a `codec` stream and return the bits of the
/// decompressed data.
pub fn strip_layer(bits: Vec<Bit>, codec: Compression) -> Result<Vec<Bit>, BitstatError> {
    if codec == Compression::None {
        return Ok(bits);
    }
    let compressed = bits::bits_to_bytes(&bits);
    let reader = codec.reader(compressed.as_slice())?;
    let stripped = bits::read_bits_from_bytes(reader, None)
        .map_err(|source| BitstatError::DecodeError { codec, source })?;
    trace!(
        "{codec} layer stripped: {} bits to {}",
        bits.len(),
        stripped.len()
    );
    Ok(stripped)
}
