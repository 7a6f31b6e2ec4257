// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Energy-divergence primitives behind the E-Divisive search.
//!
//! [`qhat`] scores every split position of a series with the two-sample
//! statistic. The prefix/suffix distance sums are updated incrementally as
//! the split sweeps left to right, so a full sweep costs O(n^2) on top of
//! the [`DivergenceMatrix`] instead of O(n^3).

/// Shortest series for which [`qhat`] evaluates any split.
pub const MIN_QHAT_LEN: usize = 5;

/// Symmetric matrix of pairwise absolute differences, stored row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct DivergenceMatrix {
    n: usize,
    values: Vec<f64>,
}

impl DivergenceMatrix {
    /// Builds `|series[i] - series[j]|` for every pair.
    pub fn build(series: &[f64]) -> Self {
        let n = series.len();
        let mut values = vec![0.0; n * n];
        for row in 0..n {
            for column in row..n {
                let delta = (series[row] - series[column]).abs();
                values[row * n + column] = delta;
                values[column * n + row] = delta;
            }
        }
        Self { n, values }
    }

    /// Side length of the matrix.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.values[row * self.n + column]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row * self.n..(row + 1) * self.n]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

/// Two-sample statistic for a split with `prefix_len` elements before it
/// and `suffix_len` after.
///
/// `cross` sums prefix-to-suffix distances, `within_prefix` and
/// `within_suffix` sum distances inside each side. The leading
/// `floor(m*n / (m+n))` factor is truncated to an integer before scaling;
/// results depend on that truncation and must keep it.
pub fn split_statistic(
    cross: f64,
    within_prefix: f64,
    within_suffix: f64,
    suffix_len: usize,
    prefix_len: usize,
) -> f64 {
    let m = suffix_len as f64;
    let n = prefix_len as f64;

    let cross_reg = cross * (2.0 / (m * n));
    let prefix_reg = within_prefix * (2.0 / (n * (n - 1.0)));
    let suffix_reg = within_suffix * (2.0 / (m * (m - 1.0)));
    let scale = ((m * n) / (m + n)).trunc();
    scale * (cross_reg - prefix_reg - suffix_reg)
}

/// Scores every split position of `series`.
///
/// The returned vector has one entry per position; the first two and last
/// two stay zero because no valid split exists there. Series shorter than
/// [`MIN_QHAT_LEN`] yield an all-zero vector.
pub fn qhat(series: &[f64]) -> Vec<f64> {
    let len = series.len();
    let mut values = vec![0.0; len];
    if len < MIN_QHAT_LEN {
        return values;
    }

    let diffs = DivergenceMatrix::build(series);

    let prefix_len = 2;
    let mut cross = 0.0;
    for i in 0..prefix_len {
        for &delta in &diffs.row(i)[prefix_len..] {
            cross += delta;
        }
    }
    let mut within_prefix = 0.0;
    for i in 0..prefix_len {
        for &delta in &diffs.row(i)[i + 1..prefix_len] {
            within_prefix += delta;
        }
    }
    let mut within_suffix = 0.0;
    for i in prefix_len..len {
        for &delta in &diffs.row(i)[i + 1..] {
            within_suffix += delta;
        }
    }
    values[prefix_len] = split_statistic(
        cross,
        within_prefix,
        within_suffix,
        len - prefix_len,
        prefix_len,
    );

    // Element `split - 1` crosses from the suffix into the prefix.
    for split in 3..len - 2 {
        let moved = diffs.row(split - 1);
        let row_delta: f64 = moved[..split - 1].iter().sum();
        let column_delta: f64 = moved[split - 1..].iter().sum();

        cross = cross - row_delta + column_delta;
        within_prefix += row_delta;
        within_suffix -= column_delta;

        values[split] = split_statistic(cross, within_prefix, within_suffix, len - split, split);
    }

    values
}

/// Position and value of the strongest statistic.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ArgMax {
    pub index: usize,
    pub value: f64,
}

/// Returns the first strict maximum, comparing against a zero baseline.
///
/// A vector with no positive entry yields `ArgMax { index: 0, value: 0.0 }`.
pub fn extract_arg_max(values: &[f64]) -> ArgMax {
    let mut best = ArgMax::default();
    for (index, &value) in values.iter().enumerate() {
        if value > best.value {
            best = ArgMax { index, value };
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::{ArgMax, DivergenceMatrix, extract_arg_max, qhat, split_statistic};

    fn brute_force_statistic(series: &[f64], split: usize) -> f64 {
        let diffs = DivergenceMatrix::build(series);
        let len = series.len();
        let mut cross = 0.0;
        let mut within_prefix = 0.0;
        let mut within_suffix = 0.0;
        for i in 0..len {
            for j in i + 1..len {
                let delta = diffs.get(i, j);
                match (i < split, j < split) {
                    (true, true) => within_prefix += delta,
                    (false, false) => within_suffix += delta,
                    _ => cross += delta,
                }
            }
        }
        split_statistic(cross, within_prefix, within_suffix, len - split, split)
    }

    #[test]
    fn divergence_matrix_two_points() {
        let diffs = DivergenceMatrix::build(&[1.0, 3.0]);
        assert_eq!(diffs.as_slice(), &[0.0, 2.0, 2.0, 0.0]);
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs.row(1), &[2.0, 0.0]);
    }

    #[test]
    fn divergence_matrix_empty() {
        let diffs = DivergenceMatrix::build(&[]);
        assert!(diffs.is_empty());
        assert!(diffs.as_slice().is_empty());
    }

    #[test]
    fn split_statistic_truncates_leading_factor() {
        // floor(15 / 8) = 1
        let value = split_statistic(10.0, 2.0, 2.0, 5, 3);
        assert!((value - 0.4667).abs() < 1e-4, "got {value}");
    }

    #[test]
    fn qhat_short_series_is_all_zero() {
        assert_eq!(qhat(&[]), Vec::<f64>::new());
        assert_eq!(qhat(&[1.0, 9.0, 1.0, 9.0]), vec![0.0; 4]);
    }

    #[test]
    fn qhat_constant_series_has_zero_maximum() {
        let values = qhat(&[5.0; 6]);
        assert_eq!(values, vec![0.0; 6]);
        assert_eq!(extract_arg_max(&values), ArgMax::default());
    }

    #[test]
    fn qhat_ramp_matches_known_values() {
        let values = qhat(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let expected = [0.0, 0.0, 4.0, 4.0, 4.0, 0.0, 0.0];
        for (got, want) in values.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "got {values:?}");
        }
    }

    #[test]
    fn qhat_step_peaks_at_the_step() {
        let mut series = vec![0.0; 10];
        series.extend(std::iter::repeat_n(10.0, 10));
        let best = extract_arg_max(&qhat(&series));
        assert_eq!(best.index, 10);
        assert!((best.value - 100.0).abs() < 1e-9);
    }

    #[test]
    fn incremental_sweep_matches_brute_force() {
        let series = [3.0, -1.0, 4.0, 1.5, -5.0, 9.0, 2.5, 6.0, -3.5];
        let values = qhat(&series);
        assert_eq!(values[0], 0.0);
        assert_eq!(values[1], 0.0);
        assert_eq!(values[series.len() - 2], 0.0);
        assert_eq!(values[series.len() - 1], 0.0);
        for split in 2..series.len() - 2 {
            let want = brute_force_statistic(&series, split);
            assert!(
                (values[split] - want).abs() < 1e-9,
                "split {split}: incremental {} vs brute force {want}",
                values[split]
            );
        }
    }

    #[test]
    fn arg_max_prefers_first_strict_maximum() {
        assert_eq!(
            extract_arg_max(&[0.0, 5.0, 3.0, 5.0]),
            ArgMax {
                index: 1,
                value: 5.0
            }
        );
    }

    #[test]
    fn arg_max_of_non_positive_values_is_zero_baseline() {
        assert_eq!(extract_arg_max(&[-1.0, -0.5, 0.0]), ArgMax::default());
        assert_eq!(extract_arg_max(&[]), ArgMax::default());
    }
}
