// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Shared types and contracts for edcp change-point detectors.

pub mod control;
pub mod detectors;
pub mod diagnostics;
pub mod error;
pub mod execution_context;
pub mod results;
pub mod series;

pub use control::CancelToken;
pub use detectors::ChangeDetector;
pub use diagnostics::{DIAGNOSTICS_SCHEMA_VERSION, Diagnostics, PermutationStats};
pub use error::CpdError;
pub use execution_context::ExecutionContext;
pub use results::{
    AlgorithmInfo, AlgorithmOption, ChangePoint, ChangePointResult, DetectionOutcome, OptionValue,
};
pub use series::SeriesView;
