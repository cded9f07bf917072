// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Baseline infilling strategies.
//!
//! These are deliberately simple reference methods — enough to run the
//! cross-validation engine end-to-end and to pin down the strategy contract.
//! Heavier statistical infillers plug in through the same
//! [`siv_core::StrategyFactory`] seam.

pub mod latest_value;
pub mod rms_closest;

pub use latest_value::LatestValue;
pub use rms_closest::RmsClosest;
