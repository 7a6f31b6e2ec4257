// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::CpdError;
use crate::diagnostics::Diagnostics;
use std::collections::HashSet;

/// Value attached to a named algorithm option.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Clone, Debug, PartialEq)]
pub enum OptionValue {
    Integer(i64),
    Unsigned(u64),
    Float(f64),
}

impl From<u64> for OptionValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::Unsigned(value), Self::Integer)
    }
}

impl From<usize> for OptionValue {
    fn from(value: usize) -> Self {
        Self::from(value as u64)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct AlgorithmOption {
    pub name: String,
    pub value: OptionValue,
}

impl AlgorithmOption {
    pub fn new(name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Identifies the detector and settings that produced a change point.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct AlgorithmInfo {
    pub name: String,
    pub version: u32,
    pub options: Vec<AlgorithmOption>,
}

/// Wire representation of one detected change point.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ChangePoint {
    pub index: usize,
    pub info: AlgorithmInfo,
}

/// Why a run produced the change points it did.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionOutcome {
    /// The series is too short for the detector to evaluate any split.
    InsufficientData { n: usize, required: usize },
    /// Enough data was available but no change point was found.
    NoChange,
    Detected,
}

/// Full detector output: change points, typed outcome and diagnostics.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ChangePointResult {
    pub change_points: Vec<ChangePoint>,
    pub outcome: DetectionOutcome,
    pub diagnostics: Diagnostics,
}

impl ChangePointResult {
    /// Builds a result, checking every index lies in `1..n` and is unique.
    ///
    /// `Detected` is only valid with at least one change point; an empty list
    /// must carry `NoChange` or `InsufficientData`.
    pub fn new(
        n: usize,
        change_points: Vec<ChangePoint>,
        outcome: DetectionOutcome,
        diagnostics: Diagnostics,
    ) -> Result<Self, CpdError> {
        let mut seen = HashSet::with_capacity(change_points.len());
        for cp in &change_points {
            if cp.index == 0 || cp.index >= n {
                return Err(CpdError::invalid_input(format!(
                    "change point index {} out of range 1..{n}",
                    cp.index
                )));
            }
            if !seen.insert(cp.index) {
                return Err(CpdError::invalid_input(format!(
                    "duplicate change point index {}",
                    cp.index
                )));
            }
        }

        match outcome {
            DetectionOutcome::Detected if change_points.is_empty() => {
                return Err(CpdError::invalid_input(
                    "outcome Detected requires at least one change point",
                ));
            }
            DetectionOutcome::NoChange | DetectionOutcome::InsufficientData { .. }
                if !change_points.is_empty() =>
            {
                return Err(CpdError::invalid_input(format!(
                    "outcome {outcome:?} cannot carry {} change points",
                    change_points.len()
                )));
            }
            _ => {}
        }

        Ok(Self {
            change_points,
            outcome,
            diagnostics,
        })
    }

    /// Change-point indices in reported order.
    pub fn indices(&self) -> Vec<usize> {
        self.change_points.iter().map(|cp| cp.index).collect()
    }
}
