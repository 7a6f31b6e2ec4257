// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Deterministic inputs shared by the criterion benches.

fn lcg_next(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state
}

/// Uniform noise in `[-0.5, 0.5)` from the high bits of the generator.
fn lcg_unit(state: &mut u64) -> f64 {
    (lcg_next(state) >> 11) as f64 / (1u64 << 53) as f64 - 0.5
}

/// `n` points split into equal-length segments at the given `levels`,
/// each perturbed by bounded noise.
pub fn noisy_steps(n: usize, levels: &[f64], seed: u64) -> Vec<f64> {
    if levels.is_empty() {
        return vec![0.0; n];
    }

    let mut state = seed;
    let segment = n.div_ceil(levels.len()).max(1);
    (0..n)
        .map(|idx| levels[(idx / segment).min(levels.len() - 1)] + lcg_unit(&mut state))
        .collect()
}
