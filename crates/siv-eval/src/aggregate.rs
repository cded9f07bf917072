// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::scores::FoldScores;
use siv_core::SivError;

/// Final accuracy table: mean score per (variable, method) over the folds
/// where the score was defined, with the contributing-fold count alongside.
/// Lower means the method reconstructed that variable more accurately.
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryTable {
    variables: Vec<String>,
    methods: Vec<String>,
    means: Vec<Option<f64>>,
    counts: Vec<usize>,
}

impl SummaryTable {
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    fn index(&self, variable: &str, method: &str) -> Result<usize, SivError> {
        let row = self
            .variables
            .iter()
            .position(|v| v == variable)
            .ok_or_else(|| {
                SivError::invalid_input(format!("unknown variable '{variable}' in summary"))
            })?;
        let col = self.methods.iter().position(|m| m == method).ok_or_else(|| {
            SivError::invalid_input(format!("unknown method '{method}' in summary"))
        })?;
        Ok(row * self.methods.len() + col)
    }

    /// Mean score; `None` when no fold produced a defined value.
    pub fn mean(&self, variable: &str, method: &str) -> Result<Option<f64>, SivError> {
        Ok(self.means[self.index(variable, method)?])
    }

    /// Number of folds that contributed to the cell.
    pub fn count(&self, variable: &str, method: &str) -> Result<usize, SivError> {
        Ok(self.counts[self.index(variable, method)?])
    }
}

/// Reduces per-fold tables into the summary.
///
/// Missing fold values contribute nothing to either sum or count; a cell no
/// fold defined stays missing rather than becoming 0.
pub fn aggregate(folds: &[FoldScores]) -> Result<SummaryTable, SivError> {
    let first = folds
        .first()
        .ok_or_else(|| SivError::invalid_input("aggregation requires at least one fold result"))?;
    for (index, fold) in folds.iter().enumerate().skip(1) {
        if !first.same_shape(fold) {
            return Err(SivError::invalid_input(format!(
                "fold result {index} ({}) has a different variable/method shape",
                fold.key()
            )));
        }
    }

    let variables = first.variables().to_vec();
    let methods = first.methods().to_vec();
    let mut means = Vec::with_capacity(variables.len() * methods.len());
    let mut counts = Vec::with_capacity(variables.len() * methods.len());

    for variable in &variables {
        for method in &methods {
            let mut sum = 0.0;
            let mut count = 0usize;
            for fold in folds {
                if let Some(score) = fold.get(variable, method)? {
                    sum += score;
                    count += 1;
                }
            }
            means.push(if count == 0 { None } else { Some(sum / count as f64) });
            counts.push(count);
        }
    }

    Ok(SummaryTable {
        variables,
        methods,
        means,
        counts,
    })
}

/// One long-form record per (fold, variable, method) for the workings output.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkingsRow {
    pub model: String,
    pub scenario: String,
    pub variable: String,
    pub method: String,
    pub score: Option<f64>,
}

/// Flattens fold tables into long-form rows, fold order preserved.
pub fn workings_rows(folds: &[FoldScores]) -> Result<Vec<WorkingsRow>, SivError> {
    let mut rows = Vec::new();
    for fold in folds {
        for variable in fold.variables() {
            for method in fold.methods() {
                rows.push(WorkingsRow {
                    model: fold.key().model.clone(),
                    scenario: fold.key().scenario.clone(),
                    variable: variable.clone(),
                    method: method.clone(),
                    score: fold.get(variable, method)?,
                });
            }
        }
    }
    Ok(rows)
}
