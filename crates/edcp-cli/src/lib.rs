// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use edcp_core::{ChangeDetector, ChangePoint, CpdError, ExecutionContext, SeriesView};

/// Parses a JSON array of numbers into a finite series.
pub fn parse_series_json(raw: &str) -> Result<Vec<f64>, CpdError> {
    let values: Vec<f64> = serde_json::from_str(raw)
        .map_err(|err| CpdError::invalid_input(format!("invalid series JSON: {err}")))?;
    SeriesView::new(&values)?;
    Ok(values)
}

/// Runs `detector` over `values` and returns the detected change points.
pub fn detect_series(
    detector: &dyn ChangeDetector,
    values: &[f64],
    ctx: &ExecutionContext<'_>,
) -> Result<Vec<ChangePoint>, CpdError> {
    let view = SeriesView::new(values)?;
    Ok(detector.detect(&view, ctx)?.change_points)
}

/// Parses `series_json`, runs `detector` and encodes the change points as a
/// JSON array.
pub fn detect_json(detector: &dyn ChangeDetector, series_json: &str) -> Result<String, CpdError> {
    let values = parse_series_json(series_json)?;
    let change_points = detect_series(detector, &values, &ExecutionContext::new())?;
    serde_json::to_string(&change_points)
        .map_err(|err| CpdError::invalid_input(format!("failed to encode change points: {err}")))
}
