// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod divergence;
pub mod multiset;

pub use divergence::{
    ArgMax, DivergenceMatrix, MIN_QHAT_LEN, extract_arg_max, qhat, split_statistic,
};
pub use multiset::OrderedMultiset;
