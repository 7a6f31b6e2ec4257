// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::results::{ChangePoint, ChangePointResult};
use crate::{CpdError, ExecutionContext, SeriesView};

/// Change-detector contract: full series in, ordered change points out.
pub trait ChangeDetector {
    fn detect(
        &self,
        x: &SeriesView<'_>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<ChangePointResult, CpdError>;

    /// Validates `series`, runs with default runtime controls and returns
    /// only the change points.
    fn detect_changes(&self, series: &[f64]) -> Result<Vec<ChangePoint>, CpdError> {
        let view = SeriesView::new(series)?;
        Ok(self.detect(&view, &ExecutionContext::new())?.change_points)
    }
}
