// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::panel::Panel;
use crate::SivError;

/// Per-method configuration, passed through to the strategy unchanged.
pub type StrategyOptions = serde_json::Map<String, serde_json::Value>;

/// Second-stage callable produced by [`InfillingStrategy::derive_relationship`].
///
/// Maps a leader-only input panel to predicted rows for the target variable,
/// one row per predicted year. The predictor decides its output years from
/// what it learned in training, relative to the input's latest year; the fold
/// evaluator enforces the shape contract on the result.
pub trait Predictor: Send {
    fn predict(&self, input: &Panel) -> Result<Panel, SivError>;
}

/// An infilling method fitted to a training panel.
pub trait InfillingStrategy: Send {
    /// Derives the leader-to-target relationship for one target variable.
    fn derive_relationship(
        &self,
        target_variable: &str,
        leaders: &[String],
        options: &StrategyOptions,
    ) -> Result<Box<dyn Predictor>, SivError>;
}

/// Builds fresh strategy instances, one per fold task.
///
/// This is the swappable seam of the engine: evaluation code never names a
/// concrete method, it only drives factories handed in by the caller.
pub trait StrategyFactory: Send + Sync {
    fn build(&self, train: &Panel) -> Result<Box<dyn InfillingStrategy>, SivError>;
}
