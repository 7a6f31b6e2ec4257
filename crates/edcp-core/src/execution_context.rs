// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::CpdError;
use crate::control::CancelToken;
use std::time::Instant;

/// Runtime controls passed through detector calls.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExecutionContext<'a> {
    pub cancel: Option<&'a CancelToken>,
    pub time_budget_ms: Option<u64>,
}

impl<'a> ExecutionContext<'a> {
    /// Creates a context with no cancellation token and no time budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the optional cancellation token.
    pub fn with_cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Sets a wall-clock budget in milliseconds.
    pub fn with_time_budget_ms(mut self, time_budget_ms: u64) -> Self {
        self.time_budget_ms = Some(time_budget_ms);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }

    /// Returns a cancelled error when cancellation has been requested.
    pub fn check_cancelled(&self) -> Result<(), CpdError> {
        if self.is_cancelled() {
            return Err(CpdError::cancelled());
        }
        Ok(())
    }

    /// Fails with a resource-limit error once the time budget is exhausted.
    pub fn check_time_budget(&self, started_at: Instant) -> Result<(), CpdError> {
        let Some(limit_ms) = self.time_budget_ms else {
            return Ok(());
        };

        let elapsed_ms = started_at.elapsed().as_millis();
        if elapsed_ms <= u128::from(limit_ms) {
            return Ok(());
        }

        Err(CpdError::resource_limit(format!(
            "time_budget_ms exceeded: elapsed_ms={elapsed_ms}, limit_ms={limit_ms}"
        )))
    }

    /// Polls cancellation and the time budget every `every` iterations.
    ///
    /// When `every` is zero, it is treated as one (always poll).
    pub fn check_runtime_controls(
        &self,
        iteration: usize,
        every: usize,
        started_at: Instant,
    ) -> Result<(), CpdError> {
        if !iteration.is_multiple_of(every.max(1)) {
            return Ok(());
        }
        self.check_cancelled()?;
        self.check_time_budget(started_at)
    }
}
