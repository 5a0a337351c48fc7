use crate::error::BitstatError;

/// Bits per unit for each accepted suffix.
const SUFFIXES: [(&str, usize); 8] = [
    ("", 1),
    ("B", 8),
    ("kB", 8 * 1000),
    ("K", 8 * 1024),
    ("MB", 8 * 1000 * 1000),
    ("M", 8 * 1024 * 1024),
    ("GB", 8 * 1000 * 1000 * 1000),
    ("G", 8 * 1024 * 1024 * 1024),
];

/// Parse a data cap such as "1234" (bits), "12B", "13kB" or "14K" into a
/// bit count. An empty string means no cap.
pub fn parse_data_cap(cap: &str) -> Result<Option<usize>, BitstatError> {
    let cap = cap.trim();
    if cap.is_empty() {
        return Ok(None);
    }

    let split = cap
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(cap.len());
    let (digits, suffix) = cap.split_at(split);

    let invalid = || BitstatError::InvalidDataCap(cap.to_string());
    let multiplier = SUFFIXES
        .iter()
        .find(|(s, _)| *s == suffix)
        .map(|&(_, m)| m)
        .ok_or_else(invalid)?;
    let amount: usize = digits.parse().map_err(|_| invalid())?;

    amount.checked_mul(multiplier).map(Some).ok_or_else(invalid)
}
