use std::cmp::Reverse;
use std::collections::hash_map::Entry;
use std::collections::{BinaryHeap, HashMap};

use log::debug;

use crate::bits::Bit;
use crate::error::BitstatError;
use crate::window::{BitWindow, MAX_WINDOW_LEN};

/// One observed pattern and how many window positions produced it.
///
/// Ordered by count first, so a heap of these is a heap of counts. Equal
/// counts fall back to the pattern value; that tie-break is arbitrary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PatternCount {
    pub count: usize,
    pub pattern: u64,
}

/// Keeps the `capacity` greatest items pushed into it.
///
/// Backed by a min-heap: the smallest retained item sits at the top and is
/// evicted when a greater one arrives.
pub struct BoundedMinHeap<T: Ord> {
    heap: BinaryHeap<Reverse<T>>,
    capacity: usize,
}

impl<T: Ord> BoundedMinHeap<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.heap.len() < self.capacity {
            self.heap.push(Reverse(item));
            return;
        }
        match self.heap.peek() {
            Some(Reverse(min)) if item > *min => {
                self.heap.pop();
                self.heap.push(Reverse(item));
            }
            _ => {}
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drain the retained items, greatest first.
    pub fn into_sorted_desc(self) -> Vec<T> {
        // Ascending over `Reverse<T>` is descending over `T`.
        self.heap.into_sorted_vec().into_iter().map(|Reverse(t)| t).collect()
    }
}

/// Occurrence counts of every `length`-bit pattern over a sequence.
///
/// Counts sum to `bits.len() - length + 1` (zero when the sequence is
/// shorter than the window).
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyTable {
    length: usize,
    counts: HashMap<u64, usize>,
    /// Canonical '0'/'1' form of every observed pattern.
    labels: HashMap<u64, String>,
}

impl FrequencyTable {
    /// Slide a `length`-bit window one position at a time across `bits`,
    /// counting the pattern at every fully formed position.
    pub fn count(bits: &[Bit], length: usize) -> Result<Self, BitstatError> {
        if length == 0 || length > MAX_WINDOW_LEN {
            return Err(BitstatError::UnsupportedWindowSize(length));
        }

        let mut counts = HashMap::new();
        let mut labels = HashMap::new();
        if bits.len() >= length {
            let mut window = BitWindow::new(bits, length)?;
            loop {
                let pattern = window.value();
                match counts.entry(pattern) {
                    Entry::Occupied(mut e) => *e.get_mut() += 1,
                    Entry::Vacant(e) => {
                        e.insert(1);
                        labels.insert(pattern, window.text());
                    }
                }
                match window.slide() {
                    Ok(()) => {}
                    Err(BitstatError::EndOfSequence) => break,
                    Err(e) => return Err(e),
                }
            }
        }

        debug!(
            "counted {} distinct {length}-bit patterns over {} bits",
            counts.len(),
            bits.len()
        );
        Ok(Self {
            length,
            counts,
            labels,
        })
    }

    /// Build a table from explicit counts.
    #[cfg(test)]
    pub(crate) fn from_counts(length: usize, counts: HashMap<u64, usize>) -> Self {
        let labels = counts
            .keys()
            .map(|&p| (p, format!("{p:0length$b}")))
            .collect();
        Self {
            length,
            counts,
            labels,
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn get(&self, pattern: u64) -> usize {
        self.counts.get(&pattern).copied().unwrap_or(0)
    }

    /// The '0'/'1' form of an observed pattern.
    pub fn label(&self, pattern: u64) -> Option<&str> {
        self.labels.get(&pattern).map(String::as_str)
    }

    /// Number of distinct patterns observed.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Number of window positions counted.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = PatternCount> + '_ {
        self.counts.iter().map(|(&pattern, &count)| PatternCount { count, pattern })
    }

    /// The `k` most frequent patterns, most frequent first. `k <= 0`, or a
    /// `k` that would not reduce the table, keeps every pattern.
    pub fn top_k(&self, k: i64) -> Vec<PatternCount> {
        let capacity = if k <= 0 {
            self.counts.len()
        } else {
            (k as usize).min(self.counts.len())
        };

        let mut heap = BoundedMinHeap::new(capacity);
        for entry in self.iter() {
            heap.push(entry);
        }
        heap.into_sorted_desc()
    }

    /// Every observed pattern in canonical string form with its count,
    /// sorted lexicographically by the string.
    pub fn sorted_patterns(&self) -> Vec<(String, usize)> {
        let mut patterns: Vec<(String, usize)> = self
            .labels
            .iter()
            .map(|(&p, label)| (label.clone(), self.get(p)))
            .collect();
        patterns.sort();
        patterns
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn counts_sum_to_positions(
            bits in prop::collection::vec(0u8..2, 0..400),
            length in 1usize..=16,
        ) {
            let table = FrequencyTable::count(&bits, length).unwrap();
            let expected = (bits.len() + 1).saturating_sub(length);
            prop_assert_eq!(table.total(), expected);
        }

        #[test]
        fn top_k_counts_dominate_rest(
            bits in prop::collection::vec(0u8..2, 8..400),
            k in 1i64..10,
        ) {
            let table = FrequencyTable::count(&bits, 3).unwrap();
            let top = table.top_k(k);
            let min_kept = top.iter().map(|pc| pc.count).min().unwrap_or(0);
            let kept: std::collections::HashSet<u64> = top.iter().map(|pc| pc.pattern).collect();
            for entry in table.iter().filter(|pc| !kept.contains(&pc.pattern)) {
                prop_assert!(entry.count <= min_kept);
            }
        }
    }
}
