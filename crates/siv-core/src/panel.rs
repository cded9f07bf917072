// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::SivError;
use crate::folds::FoldKey;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// One observation: a (model, scenario, region, variable, year) key and its value.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct PanelRow {
    pub model: String,
    pub scenario: String,
    pub region: String,
    pub variable: String,
    pub year: i32,
    pub value: f64,
}

impl PanelRow {
    pub fn new(
        model: impl Into<String>,
        scenario: impl Into<String>,
        region: impl Into<String>,
        variable: impl Into<String>,
        year: i32,
        value: f64,
    ) -> Self {
        Self {
            model: model.into(),
            scenario: scenario.into(),
            region: region.into(),
            variable: variable.into(),
            year,
            value,
        }
    }
}

/// Row predicate for [`Panel::filter`].
///
/// Every populated field must match for a row to count as matching; `keep`
/// selects whether matching rows are retained (`true`) or dropped (`false`).
#[derive(Clone, Debug)]
pub struct FilterSpec {
    pub model: Option<String>,
    pub scenario: Option<String>,
    pub region: Option<String>,
    pub variables: Option<Vec<String>>,
    pub scenarios: Option<Vec<String>>,
    pub years: Option<Vec<i32>>,
    pub keep: bool,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            model: None,
            scenario: None,
            region: None,
            variables: None,
            scenarios: None,
            years: None,
            keep: true,
        }
    }
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_variables(mut self, variables: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.variables = Some(variables.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_scenarios(mut self, scenarios: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.scenarios = Some(scenarios.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_years(mut self, years: impl IntoIterator<Item = i32>) -> Self {
        self.years = Some(years.into_iter().collect());
        self
    }

    /// Inverts the filter: drop matching rows instead of keeping them.
    pub fn drop_matching(mut self) -> Self {
        self.keep = false;
        self
    }

    fn matches(&self, row: &PanelRow) -> bool {
        if let Some(model) = &self.model {
            if row.model != *model {
                return false;
            }
        }
        if let Some(scenario) = &self.scenario {
            if row.scenario != *scenario {
                return false;
            }
        }
        if let Some(region) = &self.region {
            if row.region != *region {
                return false;
            }
        }
        if let Some(variables) = &self.variables {
            if !variables.iter().any(|v| *v == row.variable) {
                return false;
            }
        }
        if let Some(scenarios) = &self.scenarios {
            if !scenarios.iter().any(|s| *s == row.scenario) {
                return false;
            }
        }
        if let Some(years) = &self.years {
            if !years.contains(&row.year) {
                return false;
            }
        }
        true
    }
}

/// Immutable in-memory panel of scenario data.
///
/// A well-formed panel has at most one row per (model, scenario, region,
/// variable, year) key and only finite values; [`Panel::new`] enforces both.
/// Serialization is one-way: deserializing would bypass validation, so
/// panels are rebuilt from rows instead.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Panel {
    rows: Vec<PanelRow>,
}

impl Panel {
    /// Constructs a validated panel.
    pub fn new(rows: Vec<PanelRow>) -> Result<Self, SivError> {
        let mut seen: HashSet<(&str, &str, &str, &str, i32)> = HashSet::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            if !row.value.is_finite() {
                return Err(SivError::invalid_input(format!(
                    "panel values must be finite; row {index} ({}/{}/{}/{} @ {}) has {}",
                    row.model, row.scenario, row.region, row.variable, row.year, row.value
                )));
            }
            let key = (
                row.model.as_str(),
                row.scenario.as_str(),
                row.region.as_str(),
                row.variable.as_str(),
                row.year,
            );
            if !seen.insert(key) {
                return Err(SivError::invalid_input(format!(
                    "duplicate panel row at index {index}: {}/{}/{}/{} @ {}",
                    row.model, row.scenario, row.region, row.variable, row.year
                )));
            }
        }
        Ok(Self { rows })
    }

    pub fn empty() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[PanelRow] {
        &self.rows
    }

    /// Returns the subset of rows selected by `spec`.
    ///
    /// Filtering a well-formed panel cannot introduce duplicates, so the
    /// result skips re-validation.
    pub fn filter(&self, spec: &FilterSpec) -> Panel {
        let rows = self
            .rows
            .iter()
            .filter(|row| spec.matches(row) == spec.keep)
            .cloned()
            .collect();
        Panel { rows }
    }

    pub fn variables(&self) -> BTreeSet<String> {
        self.rows.iter().map(|row| row.variable.clone()).collect()
    }

    pub fn scenarios(&self) -> BTreeSet<String> {
        self.rows.iter().map(|row| row.scenario.clone()).collect()
    }

    pub fn years(&self) -> BTreeSet<i32> {
        self.rows.iter().map(|row| row.year).collect()
    }

    /// Distinct (model, scenario) pairs in deterministic order.
    pub fn fold_keys(&self) -> Vec<FoldKey> {
        let mut keys: BTreeSet<(String, String)> = BTreeSet::new();
        for row in &self.rows {
            keys.insert((row.model.clone(), row.scenario.clone()));
        }
        keys.into_iter()
            .map(|(model, scenario)| FoldKey::new(model, scenario))
            .collect()
    }

    /// All values observed for `variable` at `year`, across every scenario.
    pub fn year_values(&self, variable: &str, year: i32) -> Vec<f64> {
        self.rows
            .iter()
            .filter(|row| row.variable == variable && row.year == year)
            .map(|row| row.value)
            .collect()
    }

    /// Year-indexed values of `variable`, for panels holding one trajectory.
    ///
    /// Fails when a year appears twice (more than one model/scenario/region
    /// slice present), since the mapping would silently drop data.
    pub fn series(&self, variable: &str) -> Result<BTreeMap<i32, f64>, SivError> {
        let mut out = BTreeMap::new();
        for row in self.rows.iter().filter(|row| row.variable == variable) {
            if out.insert(row.year, row.value).is_some() {
                return Err(SivError::invalid_input(format!(
                    "panel is not a single trajectory: variable '{variable}' has multiple rows for year {}",
                    row.year
                )));
            }
        }
        Ok(out)
    }
}
