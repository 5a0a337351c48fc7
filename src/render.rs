//! Plain-text rendering of a `Stats` report.

use std::io::{self, Write};

use crate::stats::{Stats, SubstringStats};

/// Write a human-readable summary of `stats`, recursing into any nested
/// compression layer.
///
/// A window length whose top-K cut dropped patterns is listed most frequent
/// first; otherwise every pattern is listed in lexicographic order.
pub fn write_stats<W: Write>(w: &mut W, stats: &Stats) -> io::Result<()> {
    writeln!(w)?;
    writeln!(w, "bits: {}", stats.bit_count)?;
    writeln!(w)?;

    // A layered report keeps the parent short: the nested stats carry the detail.
    let substrings: Vec<&SubstringStats> = if stats.compression.is_some() {
        stats.substrings.iter().filter(|s| s.length <= 2).collect()
    } else {
        stats.substrings.iter().collect()
    };

    for (i, sub) in substrings.iter().enumerate() {
        write_substrings(w, sub)?;
        if i + 1 < substrings.len() {
            writeln!(w)?;
        }
    }

    if !stats.entropy.is_empty() {
        writeln!(w)?;
        writeln!(w, "entropy ({} blocks):", stats.entropy[0].values.len())?;
        let name_width = stats
            .entropy
            .iter()
            .map(|s| s.kind.to_string().len())
            .max()
            .unwrap_or(0);
        for series in &stats.entropy {
            if series.values.is_empty() {
                writeln!(w, "{:<name_width$}  -", series.kind.to_string())?;
                continue;
            }
            writeln!(
                w,
                "{:<name_width$}  min {:.5}  mean {:.5}  max {:.5}",
                series.kind.to_string(),
                series.min(),
                series.mean(),
                series.max()
            )?;
        }
    }

    match &stats.compression {
        Some(layer) => {
            writeln!(w)?;
            writeln!(w, "compression ratio: {:.3}", layer.ratio)?;
            writeln!(w, "compression algorithm: {}", layer.codec)?;
            write_stats(w, &layer.stats)
        }
        None => writeln!(w),
    }
}

fn write_substrings<W: Write>(w: &mut W, sub: &SubstringStats) -> io::Result<()> {
    let total = sub.table.total();
    let max = sub.top.first().map_or(0, |pc| pc.count);
    let width = max.to_string().len();

    let top;
    let rows: &[(String, usize)] = if sub.is_reduced() {
        top = sub.top_strings();
        &top
    } else {
        &sub.sorted_patterns
    };

    for &(ref pattern, count) in rows {
        let percentage = if total == 0 {
            0.0
        } else {
            count as f64 * 100.0 / total as f64
        };
        writeln!(w, "{pattern}: {count:>width$} - {percentage:.5} %")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::bytes_to_bits;
    use crate::codec::Compression;
    use crate::stats::{AnalysisConfig, analyze_bits, assemble};

    fn render(stats: &Stats) -> String {
        let mut out = Vec::new();
        write_stats(&mut out, stats).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_render_all_patterns_sorted() {
        let config = AnalysisConfig {
            max_window_len: 2,
            ..Default::default()
        };
        let stats = analyze_bits(&[1, 1, 0, 0, 1], &config).unwrap();
        let text = render(&stats);
        assert!(text.contains("bits: 5"));
        assert!(text.contains("0: 2 - 40.00000 %"));
        assert!(text.contains("1: 3 - 60.00000 %"));
        let p00 = text.find("00:").unwrap();
        let p01 = text.find("01:").unwrap();
        let p10 = text.find("10:").unwrap();
        let p11 = text.find("11:").unwrap();
        assert!(p00 < p01 && p01 < p10 && p10 < p11);
    }

    #[test]
    fn test_render_top_k_most_frequent_first() {
        let config = AnalysisConfig {
            window_len: Some(2),
            top_k: 1,
            ..Default::default()
        };
        // 00 three times, 01 and 11 once each.
        let stats = analyze_bits(&[0, 0, 0, 0, 1, 1], &config).unwrap();
        let text = render(&stats);
        assert!(text.contains("00: 3 - 60.00000 %"));
        assert!(!text.contains("01:"));
    }

    #[test]
    fn test_render_entropy_summary() {
        let config = AnalysisConfig {
            block_size: Some(8),
            ..Default::default()
        };
        let stats = analyze_bits(&bytes_to_bits(b"dead beef"), &config).unwrap();
        let text = render(&stats);
        assert!(text.contains("entropy (9 blocks):"));
        assert!(text.contains("Shannon"));
        assert!(text.contains("Brotli"));
    }

    #[test]
    fn test_render_nested_compression() {
        let bits = bytes_to_bits(&[3u8; 256]);
        let report = assemble(bits, Compression::Gzip, None, &AnalysisConfig::default()).unwrap();
        let text = render(&report.stats);
        assert!(text.contains("compression algorithm: Gzip"));
        assert!(text.contains("compression ratio: "));
        assert_eq!(text.matches("bits: ").count(), 2);
        // The parent only lists window lengths 1 and 2 before the layer.
        let layer_at = text.find("compression ratio").unwrap();
        assert!(!text[..layer_at].contains("000:"));
    }
}
