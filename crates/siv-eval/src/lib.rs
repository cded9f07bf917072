// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! The cross-validation engine: withhold one (model, scenario), ask each
//! infilling method to reconstruct its hidden years from the remaining
//! scenarios, score the reconstruction against ground truth normalized by the
//! cross-scenario spread, and reduce per-fold tables into one summary.

pub mod aggregate;
pub mod evaluator;
pub mod runner;
pub mod scores;

pub use aggregate::{aggregate, workings_rows, SummaryTable, WorkingsRow};
pub use evaluator::{evaluate_fold, EvaluationSpec, MethodSpec};
pub use runner::{run_evaluation, EvaluationReport};
pub use scores::FoldScores;
