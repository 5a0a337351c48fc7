use std::collections::HashMap;
use std::fmt;

use log::{debug, trace};

use crate::bits::{Bit, bits_to_bytes};
use crate::codec::Compression;
use crate::error::BitstatError;
use crate::window::BitWindow;

/// Which estimator produced a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EstimatorKind {
    Shannon,
    Compression(Compression),
}

impl fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimatorKind::Shannon => f.write_str("Shannon"),
            EstimatorKind::Compression(codec) => write!(f, "{codec}"),
        }
    }
}

/// One entropy value per block, each in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct EntropySeries {
    pub kind: EstimatorKind,
    pub values: Vec<f64>,
}

impl EntropySeries {
    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }
}

/// Shannon entropy of every `block_size`-bit block, over `symbol_len`-bit
/// symbols.
pub fn shannon_entropy(
    bits: &[Bit],
    block_size: usize,
    symbol_len: usize,
) -> Result<EntropySeries, BitstatError> {
    let values = bits
        .chunks(block_size.max(1))
        .map(|block| block_entropy(block, symbol_len))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(EntropySeries {
        kind: EstimatorKind::Shannon,
        values,
    })
}

/// Normalized Shannon entropy of one block.
///
/// Only observed symbols contribute to `-Σ p·log2(p)`; the sum is divided
/// by `log2(symbols in block)` so the result lies in `[0, 1]`:
/// - 0 when a single symbol fills the block
/// - 1 when every symbol in the block is distinct
///
/// A dangling partial symbol at the end of the block is dropped. Blocks
/// holding fewer than two whole symbols have entropy 0.
pub fn block_entropy(block: &[Bit], symbol_len: usize) -> Result<f64, BitstatError> {
    let symbols = block.len() / symbol_len.max(1);
    if symbols < 2 {
        return Ok(0.0);
    }

    let mut window = BitWindow::new(block, symbol_len)?;
    let mut counts: HashMap<u64, usize> = HashMap::with_capacity(symbols);
    for i in 0..symbols {
        if i > 0 {
            window.slide_by(symbol_len)?;
        }
        *counts.entry(window.value()).or_insert(0) += 1;
    }

    let n = symbols as f64;
    let mut sum = 0.0;
    for (symbol, &count) in &counts {
        let p = count as f64 / n;
        trace!("symbol {symbol:#b}: count {count}, p {p:.5}");
        sum += p * p.log2();
    }

    let entropy = (-sum / n.log2()).clamp(0.0, 1.0);
    debug!("block of {} bits: entropy {entropy:.5}", block.len());
    Ok(entropy)
}

/// Compression ratio of every `block_size`-bit block under `codec`.
///
/// Each value is `compressed_bits / block_bits`, saturated at 1.0:
/// - ~1.0 means the block is incompressible (random)
/// - <<1.0 means the block is highly structured/repetitive
///
/// Small blocks usually expand under compression framing and read as 1.0.
pub fn compression_entropy(
    bits: &[Bit],
    block_size: usize,
    codec: Compression,
) -> Result<EntropySeries, BitstatError> {
    codec.ensure_supported()?;
    let values = bits
        .chunks(block_size.max(1))
        .map(|block| compression_ratio(block, codec))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(EntropySeries {
        kind: EstimatorKind::Compression(codec),
        values,
    })
}

/// Compressed size over raw size of one block, in bits, capped at 1.0.
pub fn compression_ratio(block: &[Bit], codec: Compression) -> Result<f64, BitstatError> {
    if block.is_empty() {
        return Ok(0.0);
    }
    let compressed = codec.compress(&bits_to_bytes(block))?;
    Ok((compressed.len() as f64 * 8.0 / block.len() as f64).min(1.0))
}
