// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::CliError;
use serde::Deserialize;
use siv_core::{FoldKey, StrategyFactory, StrategyOptions};
use siv_eval::{EvaluationSpec, MethodSpec};
use siv_strategies::{LatestValue, RmsClosest};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn default_region() -> String {
    "World".to_string()
}

/// Inclusive evaluation year grid, e.g. `{start: 2020, stop: 2100, step: 10}`.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YearRange {
    pub start: i32,
    pub stop: i32,
    pub step: i32,
}

impl YearRange {
    pub fn validate(&self) -> Result<(), CliError> {
        if self.step <= 0 {
            return Err(CliError::invalid_input(format!(
                "years.step must be >= 1; got {}",
                self.step
            )));
        }
        if self.start > self.stop {
            return Err(CliError::invalid_input(format!(
                "years.start must not exceed years.stop; got {}..{}",
                self.start, self.stop
            )));
        }
        Ok(())
    }

    pub fn years(&self) -> Vec<i32> {
        (self.start..=self.stop)
            .step_by(self.step as usize)
            .collect()
    }
}

/// One method under evaluation: display name, registry kind, opaque options.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategySpec {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub options: StrategyOptions,
}

/// Explicit fold key in the configuration file.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FoldKeyConfig {
    pub model: String,
    pub scenario: String,
}

/// A complete batch-run description, loaded from JSON.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Wide-format scenario CSV holding the full panel.
    pub input: PathBuf,
    #[serde(default = "default_region")]
    pub region: String,
    /// Leader variables the predictors may see.
    pub leaders: Vec<String>,
    /// Variables to score; defaults to the leaders when omitted.
    #[serde(default)]
    pub variables: Vec<String>,
    pub years: YearRange,
    /// Years at or below the cut stay visible to predictors.
    pub cut_year: i32,
    pub strategies: Vec<StrategySpec>,
    /// Restricts the run to these (model, scenario) pairs; all pairs when absent.
    #[serde(default)]
    pub fold_keys: Option<Vec<FoldKeyConfig>>,
    pub summary_out: PathBuf,
    #[serde(default)]
    pub workings_out: Option<PathBuf>,
    /// Accepted for compatibility with plotting front-ends; the engine
    /// produces no plots and ignores it.
    #[serde(default)]
    pub plot_dir: Option<PathBuf>,
}

impl RunConfig {
    /// Startup precondition check: everything here is fatal before any
    /// parallel work begins.
    pub fn validate(&self) -> Result<(), CliError> {
        self.years.validate()?;
        if self.leaders.is_empty() {
            return Err(CliError::invalid_input("leaders must not be empty"));
        }
        if self.strategies.is_empty() {
            return Err(CliError::invalid_input("strategies must not be empty"));
        }
        for strategy in &self.strategies {
            resolve_factory(&strategy.kind)?;
        }
        if self.hidden_years().is_empty() {
            return Err(CliError::invalid_input(format!(
                "cut_year {} leaves no evaluation year hidden (years run {}..{})",
                self.cut_year, self.years.start, self.years.stop
            )));
        }
        Ok(())
    }

    /// Variables to score: the configured list, or the leaders when empty.
    pub fn scored_variables(&self) -> Vec<String> {
        if self.variables.is_empty() {
            self.leaders.clone()
        } else {
            self.variables.clone()
        }
    }

    fn hidden_years(&self) -> Vec<i32> {
        self.years
            .years()
            .into_iter()
            .filter(|&year| year > self.cut_year)
            .collect()
    }

    pub fn evaluation_spec(&self) -> EvaluationSpec {
        EvaluationSpec {
            leaders: self.leaders.clone(),
            variables: self.scored_variables(),
            cut_year: self.cut_year,
            hidden_years: self.hidden_years(),
        }
    }

    pub fn methods(&self) -> Result<Vec<MethodSpec>, CliError> {
        self.strategies
            .iter()
            .map(|strategy| {
                let factory = resolve_factory(&strategy.kind)?;
                Ok(MethodSpec::new(
                    strategy.name.clone(),
                    factory,
                    strategy.options.clone(),
                ))
            })
            .collect()
    }

    pub fn explicit_fold_keys(&self) -> Option<Vec<FoldKey>> {
        self.fold_keys.as_ref().map(|keys| {
            keys.iter()
                .map(|key| FoldKey::new(key.model.clone(), key.scenario.clone()))
                .collect()
        })
    }

    /// Every variable the run touches: scored variables plus leaders.
    pub fn panel_scope(&self) -> Vec<String> {
        let mut scope = self.scored_variables();
        for leader in &self.leaders {
            if !scope.contains(leader) {
                scope.push(leader.clone());
            }
        }
        scope
    }
}

/// Resolves a strategy `kind` against the built-in registry.
pub fn resolve_factory(kind: &str) -> Result<Arc<dyn StrategyFactory>, CliError> {
    match kind {
        "latest_value" => Ok(Arc::new(LatestValue)),
        "rms_closest" => Ok(Arc::new(RmsClosest)),
        other => Err(CliError::invalid_input(format!(
            "unknown strategy kind '{other}'; expected one of: latest_value, rms_closest"
        ))),
    }
}

/// Loads and parses a run configuration.
pub fn load_config(path: &Path) -> Result<RunConfig, CliError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| CliError::io(format!("failed to read '{}'", path.display()), source))?;
    serde_json::from_str(&raw)
        .map_err(|source| CliError::json(format!("invalid run config '{}'", path.display()), source))
}
