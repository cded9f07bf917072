// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Library surface of the `siv` binary: run configuration, panel CSV I/O, and
//! the glue that drives a full cross-validation run to completion.

pub mod config;
pub mod panel_io;

pub use config::{load_config, resolve_factory, RunConfig, StrategySpec, YearRange};
pub use panel_io::{load_panel_csv, write_summary_csv, write_workings_csv};

use serde::Serialize;
use siv_core::{FilterSpec, Panel, SivError};
use siv_eval::{run_evaluation, workings_rows};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// CLI-layer error: engine errors plus I/O and JSON context.
#[derive(Debug)]
pub enum CliError {
    Siv(SivError),
    Io {
        context: String,
        source: std::io::Error,
    },
    Json {
        context: String,
        source: serde_json::Error,
    },
    InvalidInput(String),
}

impl CliError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    /// Stable machine-readable code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Siv(SivError::InvalidInput(_)) | Self::InvalidInput(_) => "invalid_input",
            Self::Siv(SivError::ShapeContract(_)) => "shape_contract",
            Self::Siv(SivError::NumericalIssue(_)) => "numerical_issue",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Siv(err) => write!(f, "{err}"),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
            Self::Json { context, source } => write!(f, "{context}: {source}"),
            Self::InvalidInput(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Siv(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::InvalidInput(_) => None,
        }
    }
}

impl From<SivError> for CliError {
    fn from(value: SivError) -> Self {
        Self::Siv(value)
    }
}

/// What a completed run produced, echoed to stdout as JSON.
#[derive(Debug, Serialize)]
pub struct RunOutcome {
    pub folds: usize,
    pub scored_cells: usize,
    pub summary_out: PathBuf,
    pub workings_out: Option<PathBuf>,
}

/// Executes a full batch run: load, scope, evaluate in parallel, persist.
pub fn run_from_config(config: &RunConfig) -> Result<RunOutcome, CliError> {
    config.validate()?;
    let methods = config.methods()?;
    let spec = config.evaluation_spec();

    let full = load_panel_csv(&config.input)?;
    let panel = full.filter(
        &FilterSpec::new()
            .with_region(config.region.clone())
            .with_years(config.years.years())
            .with_variables(config.panel_scope()),
    );
    info!(
        rows = panel.len(),
        folds = panel.fold_keys().len(),
        methods = methods.len(),
        "panel scoped for evaluation"
    );
    if config.plot_dir.is_some() {
        debug!("plot_dir is accepted for compatibility but this tool produces no plots");
    }

    let keys = config.explicit_fold_keys();
    let report = run_evaluation(&panel, keys.as_deref(), &methods, &spec)?;

    write_summary_csv(&config.summary_out, &report.summary)?;
    if let Some(path) = &config.workings_out {
        write_workings_csv(path, &workings_rows(&report.folds)?)?;
    }

    Ok(RunOutcome {
        folds: report.folds.len(),
        scored_cells: report.folds.iter().map(|fold| fold.defined()).sum(),
        summary_out: config.summary_out.clone(),
        workings_out: config.workings_out.clone(),
    })
}

/// Shape report for `siv inspect`: enough to scope a run without starting it.
#[derive(Debug, Serialize)]
pub struct PanelSummary {
    pub rows: usize,
    pub models: usize,
    pub scenarios: usize,
    pub variables: Vec<String>,
    pub fold_keys: usize,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
}

/// Loads a panel and summarises its extent, optionally region-restricted.
pub fn inspect_panel(path: &Path, region: Option<&str>) -> Result<PanelSummary, CliError> {
    let mut panel = load_panel_csv(path)?;
    if let Some(region) = region {
        panel = panel.filter(&FilterSpec::new().with_region(region));
    }
    Ok(summarise(&panel))
}

fn summarise(panel: &Panel) -> PanelSummary {
    let models: std::collections::BTreeSet<&str> =
        panel.rows().iter().map(|row| row.model.as_str()).collect();
    let years = panel.years();
    PanelSummary {
        rows: panel.len(),
        models: models.len(),
        scenarios: panel.scenarios().len(),
        variables: panel.variables().into_iter().collect(),
        fold_keys: panel.fold_keys().len(),
        first_year: years.iter().next().copied(),
        last_year: years.iter().next_back().copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::{summarise, CliError};
    use siv_core::{Panel, PanelRow, SivError};

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(
            CliError::from(SivError::invalid_input("x")).code(),
            "invalid_input"
        );
        assert_eq!(
            CliError::from(SivError::shape_contract("x")).code(),
            "shape_contract"
        );
        assert_eq!(
            CliError::from(SivError::numerical_issue("x")).code(),
            "numerical_issue"
        );
        assert_eq!(CliError::invalid_input("x").code(), "invalid_input");
    }

    #[test]
    fn summarise_reports_panel_extent() {
        let panel = Panel::new(vec![
            PanelRow::new("m1", "s1", "World", "V", 2020, 1.0),
            PanelRow::new("m1", "s2", "World", "V", 2050, 2.0),
            PanelRow::new("m2", "s1", "World", "W", 2100, 3.0),
        ])
        .expect("panel is well-formed");
        let summary = summarise(&panel);
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.models, 2);
        assert_eq!(summary.scenarios, 2);
        assert_eq!(summary.fold_keys, 3);
        assert_eq!(summary.variables, vec!["V".to_string(), "W".to_string()]);
        assert_eq!(summary.first_year, Some(2020));
        assert_eq!(summary.last_year, Some(2100));
    }
}
