// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Shared types for scenario infilling cross-validation: the in-memory panel
//! store, fold partitioning, per-point normalization, and the pluggable
//! infilling-strategy contract.

pub mod error;
pub mod folds;
pub mod normalization;
pub mod panel;
pub mod strategy;

pub use error::SivError;
pub use folds::{Fold, FoldKey};
pub use normalization::{norm_factor, norm_factors};
pub use panel::{FilterSpec, Panel, PanelRow};
pub use strategy::{InfillingStrategy, Predictor, StrategyFactory, StrategyOptions};
