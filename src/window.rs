use crate::bits::{Bit, bit_to_char};
use crate::error::BitstatError;

/// Widest window whose contents still pack into a `u64`.
pub const MAX_WINDOW_LEN: usize = 64;

/// A fixed-size sliding view `[start, end)` over a bit sequence.
///
/// The window borrows the sequence and caches the packed value (and the
/// text form) of the last position it was read at. Reading again after a
/// slide only touches the bits that left and entered the window, so a scan
/// that slides by 1 or by the window size costs O(1) amortized per bit.
///
/// The cache is mutated on every read, so a window is owned by exactly one
/// scanning task; concurrent scans each build their own.
pub struct BitWindow<'a> {
    bits: &'a [Bit],
    start: usize,
    end: usize,
    size: usize,
    value_cache: Option<ValueCache>,
    text_cache: Option<TextCache>,
}

struct ValueCache {
    start: usize,
    end: usize,
    value: u64,
}

struct TextCache {
    start: usize,
    end: usize,
    text: String,
}

impl<'a> BitWindow<'a> {
    /// Create a window positioned at `[0, size)`.
    ///
    /// If the sequence is shorter than `size` the window covers what there
    /// is, and every slide fails with `EndOfSequence`.
    pub fn new(bits: &'a [Bit], size: usize) -> Result<Self, BitstatError> {
        if size == 0 || size > MAX_WINDOW_LEN {
            return Err(BitstatError::UnsupportedWindowSize(size));
        }
        Ok(Self {
            bits,
            start: 0,
            end: size.min(bits.len()),
            size,
            value_cache: None,
            text_cache: None,
        })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn slide(&mut self) -> Result<(), BitstatError> {
        self.slide_by(1)
    }

    /// Advance both bounds by `n`. Fails without moving if the window would
    /// pass the end of the sequence.
    pub fn slide_by(&mut self, n: usize) -> Result<(), BitstatError> {
        if self.end + n > self.bits.len() {
            return Err(BitstatError::EndOfSequence);
        }
        self.start += n;
        self.end += n;
        Ok(())
    }

    /// The window's bits packed into an integer; the bit at `start` is the
    /// highest-order bit of a `size`-bit value.
    pub fn value(&mut self) -> u64 {
        let value = match &self.value_cache {
            // Incremental update is only valid while the windows overlap or touch.
            Some(cache) if self.start < cache.end => {
                let exit = self.start - cache.start;
                let keep = self.size - exit;
                let mask = if keep >= 64 { u64::MAX } else { (1u64 << keep) - 1 };
                self.bits[cache.end..self.end]
                    .iter()
                    .fold(cache.value & mask, |acc, &b| (acc << 1) | u64::from(b))
            }
            _ => self.full_value(),
        };

        self.value_cache = Some(ValueCache {
            start: self.start,
            end: self.end,
            value,
        });
        value
    }

    fn full_value(&self) -> u64 {
        self.bits[self.start..self.end]
            .iter()
            .fold(0u64, |acc, &b| (acc << 1) | u64::from(b))
    }

    /// The window's bits as a '0'/'1' string, maintained by trimming the
    /// expired prefix and appending the entered bits.
    pub fn text(&mut self) -> String {
        let text = match self.text_cache.take() {
            Some(cache) if self.start < cache.end => {
                let mut text = cache.text;
                text.drain(..self.start - cache.start);
                text.extend(
                    self.bits[cache.end..self.end]
                        .iter()
                        .map(|&b| bit_to_char(b)),
                );
                text
            }
            _ => self.bits[self.start..self.end]
                .iter()
                .map(|&b| bit_to_char(b))
                .collect(),
        };

        self.text_cache = Some(TextCache {
            start: self.start,
            end: self.end,
            text: text.clone(),
        });
        text
    }
}
