// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod edivisive;
pub mod edm;

pub use edivisive::{
    AcceptedChangePoint, Candidate, E_DIVISIVE_NAME, E_DIVISIVE_VERSION, EDivisive,
    EDivisiveConfig, EDivisiveSearch, SearchState, SignificanceTest, StopReason, Transition,
    Window, permutation_test, refresh_candidates, split_windows,
};
pub use edm::{
    EDM_NAME, EDM_VERSION, EDivisiveMedians, EdmConfig, MedianPartition, RecurrenceTable,
    median_partition,
};
