// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Ascending multiset of `f64` backed by a contiguous vector.
///
/// Sorted after every mutation, so [`OrderedMultiset::median`] is O(1).
/// Insertion appends when the value is not below the current tail (the
/// common case for sliding windows) and otherwise binary-searches its slot.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OrderedMultiset {
    values: Vec<f64>,
}

impl OrderedMultiset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Removes every element, keeping the allocation.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Inserts one value at its sorted position.
    pub fn insert(&mut self, value: f64) {
        match self.values.last() {
            Some(&tail) if value < tail => {
                let idx = self.values.partition_point(|&v| v < value);
                self.values.insert(idx, value);
            }
            _ => self.values.push(value),
        }
    }

    /// Inserts every value of `values` in order.
    pub fn extend_from_slice(&mut self, values: &[f64]) {
        self.values.reserve(values.len());
        for &value in values {
            self.insert(value);
        }
    }

    /// Removes one occurrence of `value`.
    ///
    /// Returns `false` and leaves the multiset untouched when `value` is not
    /// present. No neighbouring element is removed in place of an absent value.
    pub fn remove(&mut self, value: f64) -> bool {
        let upper = self.values.partition_point(|&v| v <= value);
        if upper == 0 || self.values[upper - 1] != value {
            return false;
        }
        self.values.remove(upper - 1);
        true
    }

    /// Central element for odd counts, mean of the two central elements
    /// for even counts, `None` when empty.
    ///
    /// The mean halves before adding so that finite inputs near `f64::MAX`
    /// stay finite.
    pub fn median(&self) -> Option<f64> {
        let len = self.values.len();
        if len == 0 {
            return None;
        }
        let center = len / 2;
        if len % 2 != 0 {
            return Some(self.values[center]);
        }
        Some(self.values[center - 1] / 2.0 + self.values[center] / 2.0)
    }
}

impl FromIterator<f64> for OrderedMultiset {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut set = Self::new();
        for value in iter {
            set.insert(value);
        }
        set
    }
}
