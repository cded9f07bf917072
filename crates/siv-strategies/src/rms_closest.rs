// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use siv_core::{
    FilterSpec, FoldKey, InfillingStrategy, Panel, PanelRow, Predictor, SivError, StrategyFactory,
    StrategyOptions,
};

/// Predicts the target trajectory of the training scenario whose leader
/// trajectory is closest (root-mean-square over the shared context years) to
/// the infillee's.
pub struct RmsClosest;

impl StrategyFactory for RmsClosest {
    fn build(&self, train: &Panel) -> Result<Box<dyn InfillingStrategy>, SivError> {
        Ok(Box::new(RmsClosestStrategy {
            train: train.clone(),
        }))
    }
}

struct RmsClosestStrategy {
    train: Panel,
}

impl InfillingStrategy for RmsClosestStrategy {
    fn derive_relationship(
        &self,
        target_variable: &str,
        leaders: &[String],
        options: &StrategyOptions,
    ) -> Result<Box<dyn Predictor>, SivError> {
        if let Some(key) = options.keys().next() {
            return Err(SivError::invalid_input(format!(
                "rms_closest accepts no options; got '{key}'"
            )));
        }
        if leaders.is_empty() {
            return Err(SivError::invalid_input(
                "rms_closest requires at least one leader variable",
            ));
        }

        Ok(Box::new(RmsClosestPredictor {
            target: target_variable.to_string(),
            leaders: leaders.to_vec(),
            train: self.train.clone(),
        }))
    }
}

struct RmsClosestPredictor {
    target: String,
    leaders: Vec<String>,
    train: Panel,
}

impl RmsClosestPredictor {
    /// Mean squared leader distance between `input` and one training
    /// scenario, over years both sides observe. None when nothing overlaps.
    fn distance(&self, input: &Panel, candidate: &Panel) -> Result<Option<f64>, SivError> {
        let mut sum = 0.0;
        let mut count = 0usize;
        for leader in &self.leaders {
            let ours = input.series(leader)?;
            let theirs = candidate.series(leader)?;
            for (year, value) in &ours {
                if let Some(candidate_value) = theirs.get(year) {
                    let diff = value - candidate_value;
                    sum += diff * diff;
                    count += 1;
                }
            }
        }
        if count == 0 {
            return Ok(None);
        }
        Ok(Some(sum / count as f64))
    }
}

impl Predictor for RmsClosestPredictor {
    fn predict(&self, input: &Panel) -> Result<Panel, SivError> {
        let infillee = input.rows().first().ok_or_else(|| {
            SivError::invalid_input("rms_closest needs a non-empty input panel")
        })?;
        let latest_year = input
            .years()
            .into_iter()
            .max()
            .ok_or_else(|| SivError::invalid_input("rms_closest needs at least one input year"))?;

        let mut best: Option<(f64, FoldKey, Panel)> = None;
        for key in self.train.fold_keys() {
            let candidate = self.train.filter(
                &FilterSpec::new()
                    .with_model(key.model.clone())
                    .with_scenario(key.scenario.clone()),
            );
            let Some(distance) = self.distance(input, &candidate)? else {
                continue;
            };
            // Strict comparison keeps the first (lexicographically smallest)
            // key on ties, so predictions are deterministic.
            if best.as_ref().is_none_or(|(best_distance, _, _)| distance < *best_distance) {
                best = Some((distance, key, candidate));
            }
        }

        let Some((_, _, closest)) = best else {
            return Err(SivError::invalid_input(format!(
                "no training scenario shares leader years with {}/{}",
                infillee.model, infillee.scenario
            )));
        };

        let rows = closest
            .rows()
            .iter()
            .filter(|row| row.variable == self.target && row.year > latest_year)
            .map(|row| {
                PanelRow::new(
                    infillee.model.clone(),
                    infillee.scenario.clone(),
                    infillee.region.clone(),
                    self.target.clone(),
                    row.year,
                    row.value,
                )
            })
            .collect();
        Panel::new(rows)
    }
}
