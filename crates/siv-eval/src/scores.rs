// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use siv_core::{FoldKey, SivError};

/// Per-fold result table: one row per evaluated variable, one column per
/// method, each cell either a non-negative score or missing.
#[derive(Clone, Debug, PartialEq)]
pub struct FoldScores {
    key: FoldKey,
    variables: Vec<String>,
    methods: Vec<String>,
    cells: Vec<Option<f64>>,
}

impl FoldScores {
    /// A table of the given shape with every cell missing.
    pub fn all_missing(key: FoldKey, variables: &[String], methods: &[String]) -> Self {
        Self {
            key,
            variables: variables.to_vec(),
            methods: methods.to_vec(),
            cells: vec![None; variables.len() * methods.len()],
        }
    }

    pub fn key(&self) -> &FoldKey {
        &self.key
    }

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
                SivError::invalid_input(format!("unknown variable '{variable}' in fold table"))
            })?;
        let col = self
            .methods
            .iter()
            .position(|m| m == method)
            .ok_or_else(|| {
                SivError::invalid_input(format!("unknown method '{method}' in fold table"))
            })?;
        Ok(row * self.methods.len() + col)
    }

    pub fn get(&self, variable: &str, method: &str) -> Result<Option<f64>, SivError> {
        Ok(self.cells[self.index(variable, method)?])
    }

    /// Records a score. Scores must be finite and non-negative; a violation
    /// here means the evaluator produced a value the metric cannot emit.
    pub fn set(&mut self, variable: &str, method: &str, score: f64) -> Result<(), SivError> {
        if !score.is_finite() || score < 0.0 {
            return Err(SivError::numerical_issue(format!(
                "score for ({variable}, {method}) must be finite and >= 0; got {score}"
            )));
        }
        let index = self.index(variable, method)?;
        self.cells[index] = Some(score);
        Ok(())
    }

    /// True when `other` has the same variable and method axes.
    pub fn same_shape(&self, other: &FoldScores) -> bool {
        self.variables == other.variables && self.methods == other.methods
    }

    /// Number of defined cells.
    pub fn defined(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }
}
