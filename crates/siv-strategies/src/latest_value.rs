// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use siv_core::{
    InfillingStrategy, Panel, PanelRow, Predictor, SivError, StrategyFactory, StrategyOptions,
};
use std::collections::BTreeSet;

fn reject_unknown_options(name: &str, options: &StrategyOptions) -> Result<(), SivError> {
    if let Some(key) = options.keys().next() {
        return Err(SivError::invalid_input(format!(
            "{name} accepts no options; got '{key}'"
        )));
    }
    Ok(())
}

/// Extends the infillee's latest known value flat across the hidden years.
///
/// A time projector: the target variable must itself be part of the leader
/// context, since there is nothing else to extend. The output years are the
/// training panel's years for the target beyond the input's latest year.
pub struct LatestValue;

impl StrategyFactory for LatestValue {
    fn build(&self, train: &Panel) -> Result<Box<dyn InfillingStrategy>, SivError> {
        Ok(Box::new(LatestValueStrategy {
            train: train.clone(),
        }))
    }
}

struct LatestValueStrategy {
    train: Panel,
}

impl InfillingStrategy for LatestValueStrategy {
    fn derive_relationship(
        &self,
        target_variable: &str,
        leaders: &[String],
        options: &StrategyOptions,
    ) -> Result<Box<dyn Predictor>, SivError> {
        reject_unknown_options("latest_value", options)?;
        if !leaders.iter().any(|leader| leader == target_variable) {
            return Err(SivError::invalid_input(format!(
                "latest_value extends a variable from its own history; target '{target_variable}' is not among the leaders"
            )));
        }

        let train_years: BTreeSet<i32> = self
            .train
            .rows()
            .iter()
            .filter(|row| row.variable == target_variable)
            .map(|row| row.year)
            .collect();

        Ok(Box::new(LatestValuePredictor {
            target: target_variable.to_string(),
            train_years,
        }))
    }
}

struct LatestValuePredictor {
    target: String,
    train_years: BTreeSet<i32>,
}

impl Predictor for LatestValuePredictor {
    fn predict(&self, input: &Panel) -> Result<Panel, SivError> {
        let latest = input
            .rows()
            .iter()
            .filter(|row| row.variable == self.target)
            .max_by_key(|row| row.year)
            .ok_or_else(|| {
                SivError::invalid_input(format!(
                    "input panel has no '{}' rows to extend",
                    self.target
                ))
            })?;

        let rows = self
            .train_years
            .iter()
            .filter(|&&year| year > latest.year)
            .map(|&year| {
                PanelRow::new(
                    latest.model.clone(),
                    latest.scenario.clone(),
                    latest.region.clone(),
                    self.target.clone(),
                    year,
                    latest.value,
                )
            })
            .collect();
        Panel::new(rows)
    }
}
