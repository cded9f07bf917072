// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::aggregate::{aggregate, SummaryTable};
use crate::evaluator::{evaluate_fold, EvaluationSpec, MethodSpec};
use crate::scores::FoldScores;
use rayon::prelude::*;
use siv_core::{FoldKey, Panel, SivError};
use std::collections::HashSet;
use tracing::debug;

/// Outcome of a full run: the reduced summary plus the per-fold tables the
/// long-form workings output is built from.
#[derive(Clone, Debug)]
pub struct EvaluationReport {
    pub summary: SummaryTable,
    pub folds: Vec<FoldScores>,
}

/// One worker per fold, reserving a processing unit for the coordinator.
fn worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

fn validate_methods(methods: &[MethodSpec]) -> Result<(), SivError> {
    if methods.is_empty() {
        return Err(SivError::invalid_input(
            "evaluation requires at least one method",
        ));
    }
    let mut seen = HashSet::with_capacity(methods.len());
    for method in methods {
        if method.name.is_empty() {
            return Err(SivError::invalid_input("method names must be non-empty"));
        }
        if !seen.insert(method.name.as_str()) {
            return Err(SivError::invalid_input(format!(
                "duplicate method name '{}'",
                method.name
            )));
        }
    }
    Ok(())
}

/// Evaluates every fold key in parallel and reduces the results.
///
/// `keys` restricts the run to an explicit subset of (model, scenario) pairs;
/// `None` evaluates every pair present in the panel. Folds are independent:
/// each worker gets read-only borrows and returns a self-contained table, so
/// completion order is irrelevant. Any fatal evaluator error short-circuits
/// the whole run with no partial summary.
pub fn run_evaluation(
    panel: &Panel,
    keys: Option<&[FoldKey]>,
    methods: &[MethodSpec],
    spec: &EvaluationSpec,
) -> Result<EvaluationReport, SivError> {
    spec.validate()?;
    validate_methods(methods)?;
    if panel.is_empty() {
        return Err(SivError::invalid_input("evaluation panel is empty"));
    }

    let all_keys = panel.fold_keys();
    let keys: Vec<FoldKey> = match keys {
        Some(explicit) => {
            for key in explicit {
                if !all_keys.contains(key) {
                    return Err(SivError::invalid_input(format!(
                        "requested fold key {key} is not present in the panel"
                    )));
                }
            }
            explicit.to_vec()
        }
        None => all_keys,
    };

    let workers = worker_count();
    debug!(folds = keys.len(), workers, "starting parallel fold evaluation");
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|err| SivError::invalid_input(format!("failed to build worker pool: {err}")))?;

    let folds = pool.install(|| {
        keys.par_iter()
            .map(|key| evaluate_fold(panel, key, methods, spec))
            .collect::<Result<Vec<_>, SivError>>()
    })?;

    let summary = aggregate(&folds)?;
    Ok(EvaluationReport { summary, folds })
}
