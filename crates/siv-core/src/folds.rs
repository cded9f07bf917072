// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::panel::{FilterSpec, Panel};
use crate::SivError;
use std::fmt;

/// Identifies one cross-validation fold: a (model, scenario) pair whose data
/// is withheld and reconstructed from the remaining scenarios.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FoldKey {
    pub model: String,
    pub scenario: String,
}

impl FoldKey {
    pub fn new(model: impl Into<String>, scenario: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            scenario: scenario.into(),
        }
    }
}

impl fmt::Display for FoldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.model, self.scenario)
    }
}

/// One train/held-out split of a panel.
///
/// `leader_input` is what the predictor may look at (the fold key's leader
/// rows up to and including the cut year); `hidden` holds the key's rows
/// beyond the cut year (the reconstruction targets); `train` is every other
/// (model, scenario) in the panel.
#[derive(Clone, Debug)]
pub struct Fold {
    key: FoldKey,
    leader_input: Panel,
    hidden: Panel,
    train: Panel,
}

impl Fold {
    /// Splits `panel` around `key` at `cut_year`.
    pub fn partition(
        panel: &Panel,
        key: &FoldKey,
        cut_year: i32,
        leaders: &[String],
    ) -> Result<Self, SivError> {
        if leaders.is_empty() {
            return Err(SivError::invalid_input(
                "fold partitioning requires at least one leader variable",
            ));
        }

        let key_filter = FilterSpec::new()
            .with_model(key.model.clone())
            .with_scenario(key.scenario.clone());
        let held = panel.filter(&key_filter);
        let train = panel.filter(&key_filter.clone().drop_matching());

        let context_years: Vec<i32> = held
            .years()
            .into_iter()
            .filter(|year| *year <= cut_year)
            .collect();
        let leader_input = held.filter(
            &FilterSpec::new()
                .with_variables(leaders.iter().cloned())
                .with_years(context_years),
        );
        let hidden_years: Vec<i32> = held
            .years()
            .into_iter()
            .filter(|year| *year > cut_year)
            .collect();
        let hidden = held.filter(&FilterSpec::new().with_years(hidden_years));

        Ok(Self {
            key: key.clone(),
            leader_input,
            hidden,
            train,
        })
    }

    pub fn key(&self) -> &FoldKey {
        &self.key
    }

    pub fn leader_input(&self) -> &Panel {
        &self.leader_input
    }

    pub fn hidden(&self) -> &Panel {
        &self.hidden
    }

    pub fn train(&self) -> &Panel {
        &self.train
    }

    /// False when the held-out scenario carries no leader rows at all, in
    /// which case no reconstruction is possible and the fold scores missing.
    pub fn has_leader_data(&self) -> bool {
        !self.leader_input.is_empty()
    }

    /// Ground-truth rows for `variable` (hidden years only). May be empty.
    pub fn truth_for(&self, variable: &str) -> Panel {
        self.hidden
            .filter(&FilterSpec::new().with_variables([variable]))
    }
}

#[cfg(test)]
mod tests {
    use super::{Fold, FoldKey};
    use crate::panel::{Panel, PanelRow};

    fn row(model: &str, scenario: &str, variable: &str, year: i32, value: f64) -> PanelRow {
        PanelRow::new(model, scenario, "World", variable, year, value)
    }

    fn leaders() -> Vec<String> {
        vec!["Emissions|CO2".to_string()]
    }

    fn sample_panel() -> Panel {
        Panel::new(vec![
            row("m1", "s1", "Emissions|CO2", 2020, 10.0),
            row("m1", "s1", "Emissions|CO2", 2050, 11.0),
            row("m1", "s1", "Emissions|CO2", 2060, 12.0),
            row("m1", "s1", "Emissions|CH4", 2060, 0.5),
            row("m1", "s2", "Emissions|CO2", 2020, 20.0),
            row("m1", "s2", "Emissions|CO2", 2060, 22.0),
            row("m2", "s3", "Emissions|CO2", 2060, 30.0),
        ])
        .expect("sample panel should be well-formed")
    }

    #[test]
    fn partition_requires_a_leader() {
        let err = Fold::partition(&sample_panel(), &FoldKey::new("m1", "s1"), 2050, &[])
            .expect_err("empty leader list must fail");
        assert!(err.to_string().contains("at least one leader"));
    }

    #[test]
    fn train_excludes_every_held_out_row() {
        let panel = sample_panel();
        let key = FoldKey::new("m1", "s1");
        let fold = Fold::partition(&panel, &key, 2050, &leaders()).expect("partition succeeds");

        assert!(fold
            .train()
            .rows()
            .iter()
            .all(|r| !(r.model == "m1" && r.scenario == "s1")));
        assert_eq!(fold.train().len(), 3);
    }

    #[test]
    fn held_out_and_train_reconstruct_the_panel() {
        let panel = sample_panel();
        let key = FoldKey::new("m1", "s1");
        let fold = Fold::partition(&panel, &key, 2050, &leaders()).expect("partition succeeds");

        let held_rows = panel.len() - fold.train().len();
        assert_eq!(held_rows, 4);
        // leader_input (leader rows <= cut) and hidden (all rows > cut) are disjoint.
        assert_eq!(fold.leader_input().len(), 2);
        assert_eq!(fold.hidden().len(), 2);
        for row in fold.leader_input().rows() {
            assert!(row.year <= 2050);
            assert_eq!(row.variable, "Emissions|CO2");
        }
        for row in fold.hidden().rows() {
            assert!(row.year > 2050);
        }
    }

    #[test]
    fn leader_input_excludes_non_leader_variables() {
        let mut rows = sample_panel().rows().to_vec();
        rows.push(row("m1", "s1", "Emissions|CH4", 2020, 0.4));
        let panel = Panel::new(rows).expect("panel stays well-formed");
        let fold = Fold::partition(&panel, &FoldKey::new("m1", "s1"), 2050, &leaders())
            .expect("partition succeeds");
        assert!(fold
            .leader_input()
            .rows()
            .iter()
            .all(|r| r.variable == "Emissions|CO2"));
    }

    #[test]
    fn truth_for_restricts_to_variable_and_hidden_years() {
        let panel = sample_panel();
        let fold = Fold::partition(&panel, &FoldKey::new("m1", "s1"), 2050, &leaders())
            .expect("partition succeeds");

        let truth = fold.truth_for("Emissions|CH4");
        assert_eq!(truth.len(), 1);
        assert_eq!(truth.rows()[0].year, 2060);

        assert!(fold.truth_for("Emissions|N2O").is_empty());
    }

    #[test]
    fn fold_without_leader_rows_reports_no_leader_data() {
        let panel = Panel::new(vec![
            row("m1", "s1", "Emissions|CH4", 2020, 1.0),
            row("m1", "s1", "Emissions|CH4", 2060, 2.0),
            row("m1", "s2", "Emissions|CO2", 2020, 3.0),
        ])
        .expect("panel is well-formed");
        let fold = Fold::partition(&panel, &FoldKey::new("m1", "s1"), 2050, &leaders())
            .expect("partition succeeds");
        assert!(!fold.has_leader_data());
    }

    #[test]
    fn fold_key_display_joins_model_and_scenario() {
        assert_eq!(FoldKey::new("AIM/CGE 2.0", "SSP1-19").to_string(), "AIM/CGE 2.0/SSP1-19");
    }
}
