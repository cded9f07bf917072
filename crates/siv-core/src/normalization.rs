// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::panel::Panel;
use std::collections::BTreeMap;

/// Cross-scenario spread of `variable` at `year`: the population standard
/// deviation of the value over every matching row of `panel`.
///
/// Fewer than two observations mean no spread; the result is then 0.0, which
/// callers must treat as "exclude this point from scoring", never divide by.
/// The result is always finite and non-negative for a well-formed panel.
pub fn norm_factor(panel: &Panel, variable: &str, year: i32) -> f64 {
    let values = panel.year_values(variable, year);
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    variance.sqrt()
}

/// Normalization factors for `variable` at each of `years`.
pub fn norm_factors(panel: &Panel, variable: &str, years: &[i32]) -> BTreeMap<i32, f64> {
    years
        .iter()
        .map(|&year| (year, norm_factor(panel, variable, year)))
        .collect()
}
