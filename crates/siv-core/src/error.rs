// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::fmt;

/// Error type shared across the evaluation engine.
///
/// Recoverable conditions (missing fold data, zero cross-scenario spread,
/// predicted/truth row-count mismatches) are absorbed by the fold evaluator
/// and become missing cells; only fatal conditions surface as `SivError`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SivError {
    /// Malformed inputs or configuration caught before or during a run.
    InvalidInput(String),
    /// A predictor returned the wrong set of distinct years.
    ShapeContract(String),
    /// A non-finite value reached a place that must stay finite.
    NumericalIssue(String),
}

impl SivError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn shape_contract(msg: impl Into<String>) -> Self {
        Self::ShapeContract(msg.into())
    }

    pub fn numerical_issue(msg: impl Into<String>) -> Self {
        Self::NumericalIssue(msg.into())
    }
}

impl fmt::Display for SivError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "{msg}"),
            Self::ShapeContract(msg) => write!(f, "shape contract violated: {msg}"),
            Self::NumericalIssue(msg) => write!(f, "numerical issue: {msg}"),
        }
    }
}

impl std::error::Error for SivError {}
