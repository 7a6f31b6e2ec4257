// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::CpdError;

/// Borrowed, validated view over a univariate series.
///
/// Every value is finite; an empty series is allowed and leads detectors to
/// report insufficient data rather than fail.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeriesView<'a> {
    values: &'a [f64],
}

impl<'a> SeriesView<'a> {
    /// Constructs a validated `SeriesView`.
    pub fn new(values: &'a [f64]) -> Result<Self, CpdError> {
        if let Some((idx, value)) = values
            .iter()
            .copied()
            .enumerate()
            .find(|(_, v)| !v.is_finite())
        {
            return Err(CpdError::invalid_input(format!(
                "series values must be finite: index {idx} has {value}"
            )));
        }

        Ok(Self { values })
    }

    pub fn values(&self) -> &'a [f64] {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
