// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use thiserror::Error;

/// Errors surfaced by detectors, validators and runtime controls.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum CpdError {
    /// Caller supplied data or configuration the detectors cannot accept.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A statistic or score left the finite range mid-computation.
    #[error("numerical issue: {0}")]
    NumericalIssue(String),
    /// A counter, time budget or allocation bound was exceeded.
    #[error("resource limit: {0}")]
    ResourceLimit(String),
    #[error("cancelled")]
    Cancelled,
}

impl CpdError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn numerical_issue(msg: impl Into<String>) -> Self {
        Self::NumericalIssue(msg.into())
    }

    pub fn resource_limit(msg: impl Into<String>) -> Self {
        Self::ResourceLimit(msg.into())
    }

    pub fn cancelled() -> Self {
        Self::Cancelled
    }

    /// Stable machine-readable code for this error class.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NumericalIssue(_) => "numerical_issue",
            Self::ResourceLimit(_) => "resource_limit",
            Self::Cancelled => "cancelled",
        }
    }
}
