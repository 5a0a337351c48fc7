use std::io::{self, BufReader, Read};

use log::{trace, warn};

use crate::error::BitstatError;

/// A single binary digit, always 0 or 1.
pub type Bit = u8;

/// Expand one byte into its 8 bits, most-significant bit first.
///
/// Bit addressing: bit `i` of the result is `(b >> (7 - i)) & 1`.
#[inline(always)]
pub fn byte_to_bits(b: u8) -> [Bit; 8] {
    let mut bits = [0; 8];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = (b >> (7 - i)) & 1;
    }
    bits
}

/// Pack up to 8 bits into a byte, most-significant bit first. Missing
/// trailing bits are treated as zero.
#[inline(always)]
pub fn bits_to_byte(bits: &[Bit]) -> u8 {
    debug_assert!(bits.len() <= 8);
    bits.iter()
        .enumerate()
        .fold(0u8, |acc, (i, &b)| acc | ((b & 1) << (7 - i)))
}

pub fn bytes_to_bits(bytes: &[u8]) -> Vec<Bit> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &b in bytes {
        bits.extend_from_slice(&byte_to_bits(b));
    }
    bits
}

/// Pack a bit sequence into bytes. A final partial group is zero-padded on
/// the right, so `bits_to_bytes(&bytes_to_bits(b)) == b` for every `b`.
pub fn bits_to_bytes(bits: &[Bit]) -> Vec<u8> {
    bits.chunks(8).map(bits_to_byte).collect()
}

/// Parse one character of a bit-string input.
pub fn char_to_bit(c: u8) -> Result<Bit, BitstatError> {
    match c {
        b'0' => Ok(0),
        b'1' => Ok(1),
        other => Err(BitstatError::InvalidBit(other)),
    }
}

#[inline(always)]
pub(crate) fn bit_to_char(b: Bit) -> char {
    if b == 0 { '0' } else { '1' }
}

/// Render bits as a '0'/'1' string, inserting `sep` every `every` bits.
pub fn bits_to_string(bits: &[Bit], sep: Option<char>, every: usize) -> String {
    let mut s = String::with_capacity(bits.len() + bits.len() / every.max(1));
    for (i, &b) in bits.iter().enumerate() {
        if let Some(sep) = sep {
            if every > 0 && i > 0 && i % every == 0 {
                s.push(sep);
            }
        }
        s.push(bit_to_char(b));
    }
    s
}

/// Read raw bytes and expand them to bits, stopping once `max_bits` bits
/// have been collected.
pub fn read_bits_from_bytes<R: Read>(reader: R, max_bits: Option<usize>) -> io::Result<Vec<Bit>> {
    let mut bytes = Vec::new();
    match max_bits {
        Some(max) => {
            reader.take(max.div_ceil(8) as u64).read_to_end(&mut bytes)?;
        }
        None => {
            let mut reader = reader;
            reader.read_to_end(&mut bytes)?;
        }
    }
    trace!("read {} bytes from byte reader", bytes.len());

    let mut bits = bytes_to_bits(&bytes);
    if let Some(max) = max_bits {
        bits.truncate(max);
    }
    Ok(bits)
}

/// Read a '0'/'1' character stream. Any other character is logged and
/// skipped; it never aborts the read.
pub fn read_bits_from_bin_str<R: Read>(
    reader: R,
    max_bits: Option<usize>,
) -> io::Result<Vec<Bit>> {
    let mut bits = Vec::new();
    let mut skipped = 0usize;
    for byte in BufReader::new(reader).bytes() {
        if max_bits.is_some_and(|max| bits.len() >= max) {
            break;
        }
        match char_to_bit(byte?) {
            Ok(bit) => bits.push(bit),
            Err(e) => {
                skipped += 1;
                warn!("skipping unit in bit string: {e}");
            }
        }
    }
    trace!("read {} bits from bit string ({skipped} skipped)", bits.len());
    Ok(bits)
}
