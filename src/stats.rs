use log::{debug, info, trace};
use rayon::prelude::*;

use crate::bits::{Bit, bits_to_bytes, bytes_to_bits};
use crate::codec::Compression;
use crate::entropy::{EntropySeries, EstimatorKind, compression_entropy, shannon_entropy};
use crate::error::BitstatError;
use crate::frequency::{FrequencyTable, PatternCount};
use crate::window::MAX_WINDOW_LEN;

/// How deep compressed-variant stats may nest below the primary report.
pub const MAX_NESTING: usize = 1;

/// Configuration for analysing one bit sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Count every window length from 1 up to this, unless `window_len` is set.
    pub max_window_len: usize,
    /// Count exactly this window length.
    pub window_len: Option<usize>,
    /// Compute entropy series over blocks of this many bits.
    pub block_size: Option<usize>,
    /// Bits per symbol for Shannon entropy.
    pub symbol_len: usize,
    /// Patterns kept per window length (`<= 0` keeps all).
    pub top_k: i64,
    /// Compressors used as entropy proxies, alongside Shannon.
    pub entropy_codecs: Vec<Compression>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_window_len: 8,
            window_len: None,
            block_size: None,
            symbol_len: 2,
            top_k: -1,
            entropy_codecs: vec![Compression::Gzip, Compression::Brotli, Compression::Bzip2],
        }
    }
}

impl AnalysisConfig {
    /// Reject parameters that break a documented constraint, before any
    /// bits are touched.
    pub fn validate(&self) -> Result<(), BitstatError> {
        for len in self.window_lengths() {
            if len == 0 || len > MAX_WINDOW_LEN {
                return Err(BitstatError::UnsupportedWindowSize(len));
            }
        }
        if self.window_len.is_none() && self.max_window_len == 0 {
            return Err(BitstatError::UnsupportedWindowSize(0));
        }

        if let Some(block) = self.block_size {
            if block == 0 {
                return Err(BitstatError::InvalidConfiguration(
                    "block size must be positive".to_string(),
                ));
            }
            if self.symbol_len == 0 || self.symbol_len > MAX_WINDOW_LEN {
                return Err(BitstatError::InvalidConfiguration(format!(
                    "symbol length {} must be between 1 and {MAX_WINDOW_LEN}",
                    self.symbol_len
                )));
            }
            if self.symbol_len > block {
                return Err(BitstatError::InvalidConfiguration(format!(
                    "symbol length {} cannot be greater than block size {block}",
                    self.symbol_len
                )));
            }
            if block % self.symbol_len != 0 {
                return Err(BitstatError::InvalidConfiguration(format!(
                    "symbol length {} must evenly divide block size {block}",
                    self.symbol_len
                )));
            }
            for codec in &self.entropy_codecs {
                if *codec == Compression::None {
                    return Err(BitstatError::InvalidConfiguration(
                        "entropy codecs cannot include None".to_string(),
                    ));
                }
                codec.ensure_supported()?;
            }
        }
        Ok(())
    }

    /// The window lengths this configuration counts.
    pub fn window_lengths(&self) -> Vec<usize> {
        match self.window_len {
            Some(len) => vec![len],
            None => (1..=self.max_window_len).collect(),
        }
    }
}

/// Frequency results for one window length.
#[derive(Debug, Clone, PartialEq)]
pub struct SubstringStats {
    pub length: usize,
    pub table: FrequencyTable,
    /// Most frequent patterns first, at most `top_k` of them.
    pub top: Vec<PatternCount>,
    /// Every observed pattern with its count, lexicographic, regardless of
    /// the top-K cut.
    pub sorted_patterns: Vec<(String, usize)>,
}

impl SubstringStats {
    /// True when the top-K cut dropped some observed patterns.
    pub fn is_reduced(&self) -> bool {
        self.top.len() < self.table.distinct()
    }

    /// The retained patterns in canonical string form, most frequent first.
    pub fn top_strings(&self) -> Vec<(String, usize)> {
        self.top
            .iter()
            .filter_map(|pc| Some((self.table.label(pc.pattern)?.to_string(), pc.count)))
            .collect()
    }
}

/// The effect of one output compression layer.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionStats {
    /// `100 - compressed_bits * 100 / original_bits`; negative on expansion.
    pub ratio: f64,
    pub codec: Compression,
    /// Stats of the compressed bit sequence.
    pub stats: Box<Stats>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub bit_count: usize,
    pub byte_count: usize,
    pub substrings: Vec<SubstringStats>,
    pub entropy: Vec<EntropySeries>,
    pub compression: Option<CompressionStats>,
}

/// The final bit sequence and the stats describing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub bits: Vec<Bit>,
    pub stats: Stats,
}

/// Count substrings for every configured window length and, when a block
/// size is set, compute every entropy series.
///
/// Each window length and each estimator is an independent pass over the
/// same read-only bits, so they run in parallel.
pub fn analyze_bits(bits: &[Bit], config: &AnalysisConfig) -> Result<Stats, BitstatError> {
    config.validate()?;
    let lengths = config.window_lengths();

    info!(
        "analysing {} bits: windows {lengths:?}, entropy {}, symbol length {}",
        bits.len(),
        config.block_size.is_some(),
        config.symbol_len
    );

    let substrings = lengths
        .par_iter()
        .map(|&length| -> Result<SubstringStats, BitstatError> {
            let table = FrequencyTable::count(bits, length)?;
            let top = table.top_k(config.top_k);
            let sorted_patterns = table.sorted_patterns();
            Ok(SubstringStats {
                length,
                table,
                top,
                sorted_patterns,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let entropy = match config.block_size {
        Some(block_size) => {
            let kinds: Vec<EstimatorKind> = config
                .entropy_codecs
                .iter()
                .map(|&codec| EstimatorKind::Compression(codec))
                .chain(std::iter::once(EstimatorKind::Shannon))
                .collect();
            kinds
                .par_iter()
                .map(|kind| match *kind {
                    EstimatorKind::Shannon => shannon_entropy(bits, block_size, config.symbol_len),
                    EstimatorKind::Compression(codec) => {
                        compression_entropy(bits, block_size, codec)
                    }
                })
                .collect::<Result<Vec<_>, _>>()?
        }
        None => Vec::new(),
    };

    trace!("done analysing {} bits", bits.len());
    Ok(Stats {
        bit_count: bits.len(),
        byte_count: bits.len() / 8,
        substrings,
        entropy,
        compression: None,
    })
}

/// Build the report for a pipeline's final bits.
///
/// Without output compression the bits are capped to `out_max_bits` and
/// analysed as-is. With it, the primary stats describe the uncompressed
/// bits, the visible bits become the compressed stream capped to
/// `out_max_bits`, and a nested `CompressionStats` describes exactly those
/// visible bits.
pub fn assemble(
    bits: Vec<Bit>,
    out_compression: Compression,
    out_max_bits: Option<usize>,
    config: &AnalysisConfig,
) -> Result<Report, BitstatError> {
    let mut bits = bits;
    if out_compression == Compression::None {
        cap(&mut bits, out_max_bits);
    }
    let stats = stage(&mut bits, out_compression, out_max_bits, config, 0)?;
    Ok(Report { bits, stats })
}

/// Analyse `bits` and, if a codec is given and the nesting bound allows,
/// replace them with their capped compressed form and recurse once for the
/// compressed variant.
fn stage(
    bits: &mut Vec<Bit>,
    codec: Compression,
    out_max_bits: Option<usize>,
    config: &AnalysisConfig,
    depth: usize,
) -> Result<Stats, BitstatError> {
    let mut stats = analyze_bits(bits.as_slice(), config)?;
    if codec == Compression::None || depth >= MAX_NESTING {
        return Ok(stats);
    }

    let mut compressed = bytes_to_bits(&codec.compress(&bits_to_bytes(bits.as_slice()))?);
    debug!(
        "{codec} layer: {} bits compressed to {}",
        bits.len(),
        compressed.len()
    );
    cap(&mut compressed, out_max_bits);

    let ratio = compression_ratio_percent(bits.len(), compressed.len());
    let nested = stage(
        &mut compressed,
        Compression::None,
        None,
        &AnalysisConfig::default(),
        depth + 1,
    )?;
    stats.compression = Some(CompressionStats {
        ratio,
        codec,
        stats: Box::new(nested),
    });
    *bits = compressed;
    Ok(stats)
}

/// Space saved by a compression layer, as a percentage of the original.
pub fn compression_ratio_percent(original_bits: usize, compressed_bits: usize) -> f64 {
    if original_bits == 0 {
        return 0.0;
    }
    100.0 - (compressed_bits as f64 * 100.0) / original_bits as f64
}

fn cap(bits: &mut Vec<Bit>, max_bits: Option<usize>) {
    if let Some(max) = max_bits {
        bits.truncate(max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dead_beef() -> Vec<Bit> {
        bytes_to_bits(b"dead beef")
    }

    #[test]
    fn test_default_counts_lengths_one_to_eight() {
        let bits = dead_beef();
        let stats = analyze_bits(&bits, &AnalysisConfig::default()).unwrap();
        assert_eq!(stats.bit_count, 72);
        assert_eq!(stats.byte_count, 9);
        assert_eq!(stats.substrings.len(), 8);
        for (i, sub) in stats.substrings.iter().enumerate() {
            assert_eq!(sub.length, i + 1);
            assert_eq!(sub.table.total(), 72 - sub.length + 1);
            assert!(!sub.is_reduced());
            assert_eq!(sub.sorted_patterns.len(), sub.table.distinct());
            let listed: usize = sub.sorted_patterns.iter().map(|(_, count)| count).sum();
            assert_eq!(listed, sub.table.total());
        }
        assert!(stats.entropy.is_empty());
        assert!(stats.compression.is_none());
    }

    #[test]
    fn test_exact_window_length() {
        let config = AnalysisConfig {
            window_len: Some(3),
            ..Default::default()
        };
        let stats = analyze_bits(&dead_beef(), &config).unwrap();
        assert_eq!(stats.substrings.len(), 1);
        assert_eq!(stats.substrings[0].length, 3);
    }

    #[test]
    fn test_top_k_reduces() {
        let config = AnalysisConfig {
            top_k: 2,
            ..Default::default()
        };
        let stats = analyze_bits(&dead_beef(), &config).unwrap();
        let bytes = &stats.substrings[7];
        assert_eq!(bytes.top.len(), 2);
        assert!(bytes.is_reduced());
        assert!(bytes.top[0].count >= bytes.top[1].count);
        let strings = bytes.top_strings();
        assert_eq!(strings.len(), 2);
        assert_eq!(strings[0].1, bytes.top[0].count);
        assert_eq!(
            u64::from_str_radix(&strings[0].0, 2).unwrap(),
            bytes.top[0].pattern
        );
        // The full listing is kept independent of the cut.
        assert_eq!(bytes.sorted_patterns.len(), bytes.table.distinct());
        // Single bits: only two patterns, nothing to cut.
        assert!(!stats.substrings[0].is_reduced());
    }

    #[test]
    fn test_entropy_series_order() {
        let config = AnalysisConfig {
            block_size: Some(16),
            ..Default::default()
        };
        let stats = analyze_bits(&dead_beef(), &config).unwrap();
        let kinds: Vec<EstimatorKind> = stats.entropy.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EstimatorKind::Compression(Compression::Gzip),
                EstimatorKind::Compression(Compression::Brotli),
                EstimatorKind::Compression(Compression::Bzip2),
                EstimatorKind::Shannon,
            ]
        );
        for series in &stats.entropy {
            // 72 bits in 16-bit blocks.
            assert_eq!(series.values.len(), 5);
            assert!(series.values.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_validate_rejects_bad_configs() {
        let wide = AnalysisConfig {
            window_len: Some(65),
            ..Default::default()
        };
        assert!(matches!(
            wide.validate(),
            Err(BitstatError::UnsupportedWindowSize(65))
        ));

        let wide_max = AnalysisConfig {
            max_window_len: 70,
            ..Default::default()
        };
        assert!(matches!(
            wide_max.validate(),
            Err(BitstatError::UnsupportedWindowSize(65))
        ));

        let indivisible = AnalysisConfig {
            block_size: Some(10),
            symbol_len: 3,
            ..Default::default()
        };
        assert!(matches!(
            indivisible.validate(),
            Err(BitstatError::InvalidConfiguration(_))
        ));

        let oversized_symbol = AnalysisConfig {
            block_size: Some(4),
            symbol_len: 8,
            ..Default::default()
        };
        assert!(matches!(
            oversized_symbol.validate(),
            Err(BitstatError::InvalidConfiguration(_))
        ));

        let huff = AnalysisConfig {
            block_size: Some(64),
            entropy_codecs: vec![Compression::Huff],
            ..Default::default()
        };
        assert!(matches!(
            huff.validate(),
            Err(BitstatError::UnsupportedCompression(Compression::Huff))
        ));

        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_bits_are_valid() {
        let config = AnalysisConfig {
            block_size: Some(8),
            ..Default::default()
        };
        let stats = analyze_bits(&[], &config).unwrap();
        assert_eq!(stats.bit_count, 0);
        assert!(stats.substrings.iter().all(|s| s.table.distinct() == 0));
        assert!(stats.entropy.iter().all(|s| s.values.is_empty()));
    }

    #[test]
    fn test_assemble_caps_plain_output() {
        let report =
            assemble(dead_beef(), Compression::None, Some(32), &AnalysisConfig::default()).unwrap();
        assert_eq!(bits_to_bytes(&report.bits), b"dead");
        assert_eq!(report.stats.bit_count, 32);
    }

    #[test]
    fn test_assemble_nests_compression_stats() {
        let bits = bytes_to_bits(&[7u8; 512]);
        let report =
            assemble(bits.clone(), Compression::Zstd, None, &AnalysisConfig::default()).unwrap();

        // Primary stats describe the uncompressed bits.
        assert_eq!(report.stats.bit_count, bits.len());
        let layer = report.stats.compression.as_ref().unwrap();
        assert_eq!(layer.codec, Compression::Zstd);
        assert!(layer.ratio > 50.0, "ratio {}", layer.ratio);

        // Visible bits are the compressed stream, and the nested stats
        // describe exactly those bits.
        assert_eq!(layer.stats.bit_count, report.bits.len());
        assert_eq!(
            Compression::Zstd.decompress(&bits_to_bytes(&report.bits)).unwrap(),
            vec![7u8; 512]
        );

        // Nesting stops after one level.
        assert!(layer.stats.compression.is_none());
    }

    #[test]
    fn test_assemble_caps_after_compression() {
        let bits = bytes_to_bits(&[7u8; 512]);
        let report =
            assemble(bits, Compression::Gzip, Some(16), &AnalysisConfig::default()).unwrap();
        assert_eq!(report.bits.len(), 16);
        // gzip magic
        assert_eq!(bits_to_bytes(&report.bits), vec![0x1f, 0x8b]);
        assert_eq!(report.stats.bit_count, 4096);

        // The layer describes the capped bits the caller receives.
        let layer = report.stats.compression.unwrap();
        assert_eq!(layer.stats.bit_count, 16);
        assert_eq!(layer.ratio, compression_ratio_percent(4096, 16));
        assert_eq!(layer.stats.substrings[7].table.total(), 16 - 8 + 1);
    }

    #[test]
    fn test_compression_ratio_percent() {
        assert_eq!(compression_ratio_percent(100, 25), 75.0);
        assert_eq!(compression_ratio_percent(100, 150), -50.0);
        assert_eq!(compression_ratio_percent(0, 80), 0.0);
    }
}
