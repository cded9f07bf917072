// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::scores::FoldScores;
use siv_core::{
    norm_factors, FilterSpec, Fold, FoldKey, Panel, SivError, StrategyFactory, StrategyOptions,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// One method under evaluation: a display name, the factory that builds fresh
/// strategy instances per fold, and the options passed through to it.
#[derive(Clone)]
pub struct MethodSpec {
    pub name: String,
    pub factory: Arc<dyn StrategyFactory>,
    pub options: StrategyOptions,
}

impl MethodSpec {
    pub fn new(
        name: impl Into<String>,
        factory: Arc<dyn StrategyFactory>,
        options: StrategyOptions,
    ) -> Self {
        Self {
            name: name.into(),
            factory,
            options,
        }
    }
}

/// Run-wide evaluation parameters.
#[derive(Clone, Debug)]
pub struct EvaluationSpec {
    /// Leader variables the predictor may see.
    pub leaders: Vec<String>,
    /// Variables whose reconstruction accuracy is scored.
    pub variables: Vec<String>,
    /// Years at or below the cut stay visible; years beyond it are hidden.
    pub cut_year: i32,
    /// The hidden years each predictor is asked to reconstruct, ascending.
    pub hidden_years: Vec<i32>,
}

impl EvaluationSpec {
    pub fn validate(&self) -> Result<(), SivError> {
        if self.leaders.is_empty() {
            return Err(SivError::invalid_input(
                "evaluation requires at least one leader variable",
            ));
        }
        if self.variables.is_empty() {
            return Err(SivError::invalid_input(
                "evaluation requires at least one variable to score",
            ));
        }
        if self.hidden_years.is_empty() {
            return Err(SivError::invalid_input(
                "evaluation requires at least one hidden year beyond the cut year",
            ));
        }
        for window in self.hidden_years.windows(2) {
            if window[0] >= window[1] {
                return Err(SivError::invalid_input(format!(
                    "hidden years must be strictly increasing; got {} then {}",
                    window[0], window[1]
                )));
            }
        }
        if self.hidden_years[0] <= self.cut_year {
            return Err(SivError::invalid_input(format!(
                "hidden years must lie beyond the cut year {}; got {}",
                self.cut_year, self.hidden_years[0]
            )));
        }
        Ok(())
    }
}

/// Evaluates every (method, variable) combination for one fold.
///
/// Recoverable conditions (no leader data, no ground truth, row-count
/// mismatch, no scorable years) leave cells missing and are logged; strategy
/// failures and shape-contract violations abort the fold with an error that
/// the runner propagates as a run-level failure.
pub fn evaluate_fold(
    panel: &Panel,
    key: &FoldKey,
    methods: &[MethodSpec],
    spec: &EvaluationSpec,
) -> Result<FoldScores, SivError> {
    let method_names: Vec<String> = methods.iter().map(|m| m.name.clone()).collect();
    let mut scores = FoldScores::all_missing(key.clone(), &spec.variables, &method_names);

    let fold = Fold::partition(panel, key, spec.cut_year, &spec.leaders)?;
    if !fold.has_leader_data() {
        warn!(fold = %key, "no leader data in held-out scenario; fold scored all-missing");
        return Ok(scores);
    }

    for method in methods {
        for variable in &spec.variables {
            if let Some(score) = score_one(panel, &fold, method, variable, spec)? {
                scores.set(variable, &method.name, score)?;
            }
        }
        debug!(fold = %key, method = %method.name, "completed method");
    }

    Ok(scores)
}

/// Scores one (method, variable) cell; `Ok(None)` means the cell stays missing.
fn score_one(
    panel: &Panel,
    fold: &Fold,
    method: &MethodSpec,
    variable: &str,
    spec: &EvaluationSpec,
) -> Result<Option<f64>, SivError> {
    let key = fold.key();

    let truth = fold.truth_for(variable);
    if truth.is_empty() {
        debug!(fold = %key, variable, "no ground truth for variable in this fold");
        return Ok(None);
    }

    // Only train on scenarios that actually carry the target variable, but
    // keep all of their variables so the strategy sees full trajectories.
    let valid_scenarios = fold
        .train()
        .filter(&FilterSpec::new().with_variables([variable]))
        .scenarios();
    let train = fold
        .train()
        .filter(&FilterSpec::new().with_scenarios(valid_scenarios));

    let strategy = method.factory.build(&train)?;
    let predictor = strategy.derive_relationship(variable, &spec.leaders, &method.options)?;
    let predicted = predictor
        .predict(fold.leader_input())?
        .filter(&FilterSpec::new().with_variables([variable]));

    // Shape contract: exactly one row per requested hidden year.
    let predicted_years = predicted.years();
    if predicted_years.len() != spec.hidden_years.len() {
        return Err(SivError::shape_contract(format!(
            "method '{}' predicted {} distinct years for '{variable}' in fold {key}, expected {}",
            method.name,
            predicted_years.len(),
            spec.hidden_years.len()
        )));
    }
    if predicted.len() != predicted_years.len() {
        return Err(SivError::shape_contract(format!(
            "method '{}' returned {} rows over {} distinct years for '{variable}' in fold {key}",
            method.name,
            predicted.len(),
            predicted_years.len()
        )));
    }

    if predicted.len() != truth.len() {
        warn!(
            fold = %key,
            method = %method.name,
            variable,
            predicted = predicted.len(),
            expected = truth.len(),
            "row count mismatch between prediction and ground truth; cell left missing"
        );
        return Ok(None);
    }

    let predicted_series = predicted.series(variable)?;
    let truth_series = truth.series(variable)?;
    let factors = norm_factors(panel, variable, &spec.hidden_years);

    let mut sum = 0.0;
    let mut included = 0usize;
    for (year, truth_value) in &truth_series {
        let Some(predicted_value) = predicted_series.get(year) else {
            continue;
        };
        let sigma = factors.get(year).copied().unwrap_or(0.0);
        if sigma <= 0.0 {
            debug!(fold = %key, variable, year, "no cross-scenario spread; year excluded from score");
            continue;
        }
        let residual = (predicted_value - truth_value) / sigma;
        sum += residual * residual;
        included += 1;
    }

    if included == 0 {
        debug!(fold = %key, method = %method.name, variable, "no scorable years; cell left missing");
        return Ok(None);
    }

    let score = (sum / included as f64).sqrt();
    if !score.is_finite() {
        return Err(SivError::numerical_issue(format!(
            "non-finite score for ('{variable}', '{}') in fold {key}: {score}",
            method.name
        )));
    }
    Ok(Some(score))
}

#[cfg(test)]
mod tests {
    use super::{evaluate_fold, EvaluationSpec, MethodSpec};
    use siv_core::{
        FoldKey, InfillingStrategy, Panel, PanelRow, Predictor, SivError, StrategyFactory,
        StrategyOptions,
    };
    use std::sync::Arc;

    const CO2: &str = "Emissions|CO2";

    /// Strategy that ignores training entirely and returns canned rows.
    struct Fixed {
        rows: Vec<PanelRow>,
    }

    impl StrategyFactory for Fixed {
        fn build(&self, _train: &Panel) -> Result<Box<dyn InfillingStrategy>, SivError> {
            Ok(Box::new(FixedStrategy {
                rows: self.rows.clone(),
            }))
        }
    }

    struct FixedStrategy {
        rows: Vec<PanelRow>,
    }

    impl InfillingStrategy for FixedStrategy {
        fn derive_relationship(
            &self,
            _target_variable: &str,
            _leaders: &[String],
            _options: &StrategyOptions,
        ) -> Result<Box<dyn Predictor>, SivError> {
            Ok(Box::new(FixedPredictor {
                rows: self.rows.clone(),
            }))
        }
    }

    struct FixedPredictor {
        rows: Vec<PanelRow>,
    }

    impl Predictor for FixedPredictor {
        fn predict(&self, _input: &Panel) -> Result<Panel, SivError> {
            Panel::new(self.rows.clone())
        }
    }

    fn method(name: &str, rows: Vec<PanelRow>) -> MethodSpec {
        MethodSpec::new(name, Arc::new(Fixed { rows }), StrategyOptions::new())
    }

    fn row(scenario: &str, year: i32, value: f64) -> PanelRow {
        PanelRow::new("m1", scenario, "World", CO2, year, value)
    }

    fn spec() -> EvaluationSpec {
        EvaluationSpec {
            leaders: vec![CO2.to_string()],
            variables: vec![CO2.to_string()],
            cut_year: 2050,
            hidden_years: vec![2060, 2070],
        }
    }

    /// s1 is held out; s2/s3 provide spread 1.0 at 2060 and 2.0 at 2070.
    fn panel() -> Panel {
        Panel::new(vec![
            row("s1", 2020, 10.0),
            row("s1", 2060, 12.0),
            row("s1", 2070, 14.0),
            row("s2", 2020, 20.0),
            row("s2", 2060, 21.0),
            row("s2", 2070, 22.0),
            row("s3", 2020, 30.0),
            row("s3", 2060, 23.0),
            row("s3", 2070, 26.0),
        ])
        .expect("test panel is well-formed")
    }

    fn assert_approx_eq(actual: f64, expected: f64) {
        let delta = (actual - expected).abs();
        assert!(
            delta <= 1e-12,
            "expected {expected}, got {actual} (delta={delta})"
        );
    }

    #[test]
    fn exact_prediction_scores_zero() {
        let exact = method("exact", vec![row("s1", 2060, 12.0), row("s1", 2070, 14.0)]);
        let scores = evaluate_fold(&panel(), &FoldKey::new("m1", "s1"), &[exact], &spec())
            .expect("fold should evaluate");
        assert_approx_eq(
            scores.get(CO2, "exact").expect("cell exists").expect("score defined"),
            0.0,
        );
    }

    #[test]
    fn offset_prediction_scores_normalized_rms() {
        // sigma(2060) over {12, 21, 23} is population std of those three
        // values across all scenarios; use per-year residuals directly.
        let panel = panel();
        let offset = method("offset", vec![row("s1", 2060, 13.0), row("s1", 2070, 15.0)]);
        let scores = evaluate_fold(&panel, &FoldKey::new("m1", "s1"), &[offset], &spec())
            .expect("fold should evaluate");
        let sigma_2060 = siv_core::norm_factor(&panel, CO2, 2060);
        let sigma_2070 = siv_core::norm_factor(&panel, CO2, 2070);
        let expected =
            ((1.0 / (sigma_2060 * sigma_2060) + 1.0 / (sigma_2070 * sigma_2070)) / 2.0).sqrt();
        assert_approx_eq(
            scores.get(CO2, "offset").expect("cell exists").expect("score defined"),
            expected,
        );
    }

    #[test]
    fn fold_without_leader_data_scores_all_missing() {
        let panel = Panel::new(vec![
            PanelRow::new("m1", "s1", "World", "Emissions|CH4", 2020, 1.0),
            row("s1", 2060, 12.0),
            row("s2", 2020, 20.0),
            row("s2", 2060, 21.0),
        ])
        .expect("test panel is well-formed");
        let mut spec = spec();
        spec.hidden_years = vec![2060];
        let exact = method("exact", vec![row("s1", 2060, 12.0)]);
        let scores = evaluate_fold(&panel, &FoldKey::new("m1", "s1"), &[exact], &spec)
            .expect("fold should evaluate");
        assert_eq!(scores.defined(), 0);
    }

    #[test]
    fn missing_truth_leaves_cell_missing() {
        let mut spec = spec();
        spec.variables = vec!["Emissions|CH4".to_string()];
        let exact = method("exact", vec![row("s1", 2060, 12.0), row("s1", 2070, 14.0)]);
        let scores = evaluate_fold(&panel(), &FoldKey::new("m1", "s1"), &[exact], &spec)
            .expect("fold should evaluate");
        assert_eq!(scores.defined(), 0);
    }

    #[test]
    fn wrong_distinct_year_count_is_a_shape_contract_error() {
        let short = method("short", vec![row("s1", 2060, 12.0)]);
        let err = evaluate_fold(&panel(), &FoldKey::new("m1", "s1"), &[short], &spec())
            .expect_err("wrong year count must fail the run");
        assert!(matches!(err, SivError::ShapeContract(_)));
        assert!(err.to_string().contains("predicted 1 distinct years"));
    }

    #[test]
    fn zero_spread_years_are_excluded() {
        // All scenarios share the 2060 value, so sigma(2060) = 0; only 2070
        // contributes to the score.
        let panel = Panel::new(vec![
            row("s1", 2020, 10.0),
            row("s1", 2060, 5.0),
            row("s1", 2070, 14.0),
            row("s2", 2020, 20.0),
            row("s2", 2060, 5.0),
            row("s2", 2070, 22.0),
            row("s3", 2020, 30.0),
            row("s3", 2060, 5.0),
            row("s3", 2070, 26.0),
        ])
        .expect("test panel is well-formed");
        let offset = method("offset", vec![row("s1", 2060, 99.0), row("s1", 2070, 15.0)]);
        let scores = evaluate_fold(&panel, &FoldKey::new("m1", "s1"), &[offset], &spec())
            .expect("fold should evaluate");
        let sigma_2070 = siv_core::norm_factor(&panel, CO2, 2070);
        assert_approx_eq(
            scores.get(CO2, "offset").expect("cell exists").expect("score defined"),
            1.0 / sigma_2070,
        );
    }

    #[test]
    fn all_zero_spread_leaves_cell_missing() {
        let panel = Panel::new(vec![
            row("s1", 2020, 10.0),
            row("s1", 2060, 5.0),
            row("s2", 2020, 20.0),
            row("s2", 2060, 5.0),
        ])
        .expect("test panel is well-formed");
        let mut spec = spec();
        spec.hidden_years = vec![2060];
        let offset = method("offset", vec![row("s1", 2060, 99.0)]);
        let scores = evaluate_fold(&panel, &FoldKey::new("m1", "s1"), &[offset], &spec)
            .expect("fold should evaluate");
        assert_eq!(scores.get(CO2, "offset").expect("cell exists"), None);
    }

    #[test]
    fn spec_validation_rejects_inconsistent_inputs() {
        let mut bad = spec();
        bad.leaders.clear();
        assert!(bad.validate().is_err());

        let mut bad = spec();
        bad.hidden_years = vec![2060, 2060];
        assert!(bad.validate().is_err());

        let mut bad = spec();
        bad.hidden_years = vec![2040];
        let err = bad.validate().expect_err("hidden year before cut must fail");
        assert!(err.to_string().contains("beyond the cut year"));
    }
}
