// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::CliError;
use siv_core::{Panel, PanelRow};
use siv_eval::{SummaryTable, WorkingsRow};
use std::fs;
use std::path::Path;

/// Loads a wide-format scenario CSV:
/// `Model,Scenario,Region,Variable[,Unit],<year>,<year>,...`
///
/// Blank value cells mean "no observation for that year" and produce no row.
/// Units are carried by the source format but not by the panel; the column is
/// accepted and skipped.
pub fn load_panel_csv(path: &Path) -> Result<Panel, CliError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| CliError::io(format!("failed to read '{}'", path.display()), source))?;
    parse_panel_csv(&raw).map_err(|err| match err {
        CliError::InvalidInput(msg) => {
            CliError::invalid_input(format!("{}: {msg}", path.display()))
        }
        other => other,
    })
}

fn parse_panel_csv(raw: &str) -> Result<Panel, CliError> {
    let mut lines = raw
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let Some((_, header)) = lines.next() else {
        return Err(CliError::invalid_input("CSV input is empty"));
    };
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    let layout = HeaderLayout::parse(&columns)?;

    let mut rows = Vec::new();
    for (line_number, line) in lines {
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        if cells.len() != columns.len() {
            return Err(CliError::invalid_input(format!(
                "row {line_number} has {} columns but the header has {}",
                cells.len(),
                columns.len()
            )));
        }
        for (key_column, name) in [
            (0usize, "model"),
            (1, "scenario"),
            (2, "region"),
            (3, "variable"),
        ] {
            if cells[key_column].is_empty() {
                return Err(CliError::invalid_input(format!(
                    "row {line_number} has an empty {name} column"
                )));
            }
        }

        for (year, column_index) in &layout.year_columns {
            let cell = cells[*column_index];
            if cell.is_empty() {
                continue;
            }
            let value = cell.parse::<f64>().map_err(|_| {
                CliError::invalid_input(format!(
                    "row {line_number} column {} is not a valid number: '{cell}'",
                    column_index + 1
                ))
            })?;
            if !value.is_finite() {
                return Err(CliError::invalid_input(format!(
                    "row {line_number} column {} must be finite; got {value}",
                    column_index + 1
                )));
            }
            rows.push(PanelRow::new(
                cells[0], cells[1], cells[2], cells[3], *year, value,
            ));
        }
    }

    Panel::new(rows).map_err(CliError::from)
}

struct HeaderLayout {
    year_columns: Vec<(i32, usize)>,
}

impl HeaderLayout {
    fn parse(columns: &[&str]) -> Result<Self, CliError> {
        const KEYS: [&str; 4] = ["model", "scenario", "region", "variable"];
        if columns.len() < KEYS.len() + 1 {
            return Err(CliError::invalid_input(format!(
                "header needs model, scenario, region, variable and at least one year column; got {} columns",
                columns.len()
            )));
        }
        for (index, expected) in KEYS.iter().enumerate() {
            if !columns[index].eq_ignore_ascii_case(expected) {
                return Err(CliError::invalid_input(format!(
                    "header column {} must be '{expected}'; got '{}'",
                    index + 1,
                    columns[index]
                )));
            }
        }

        let mut first_data = KEYS.len();
        if columns[first_data].eq_ignore_ascii_case("unit") {
            first_data += 1;
        }

        let mut year_columns = Vec::with_capacity(columns.len() - first_data);
        for (offset, column) in columns[first_data..].iter().enumerate() {
            let column_index = first_data + offset;
            let year = column.parse::<i32>().map_err(|_| {
                CliError::invalid_input(format!(
                    "header column {} is not a year: '{column}'",
                    column_index + 1
                ))
            })?;
            year_columns.push((year, column_index));
        }
        if year_columns.is_empty() {
            return Err(CliError::invalid_input(
                "header contains no year columns after the key columns",
            ));
        }
        Ok(Self { year_columns })
    }
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn format_score(score: Option<f64>) -> String {
    // Blank cells are the missing marker; never a fabricated zero.
    score.map(|value| value.to_string()).unwrap_or_default()
}

/// Writes the summary table: rows are variables, columns are method names,
/// blank cells where no fold could be scored.
pub fn write_summary_csv(path: &Path, summary: &SummaryTable) -> Result<(), CliError> {
    let mut out = String::new();
    out.push_str("variable");
    for method in summary.methods() {
        out.push(',');
        out.push_str(&csv_field(method));
    }
    out.push('\n');
    for variable in summary.variables() {
        out.push_str(&csv_field(variable));
        for method in summary.methods() {
            out.push(',');
            out.push_str(&format_score(summary.mean(variable, method)?));
        }
        out.push('\n');
    }
    fs::write(path, out)
        .map_err(|source| CliError::io(format!("failed to write '{}'", path.display()), source))
}

/// Writes the long-form workings file: one row per (fold, variable, method).
pub fn write_workings_csv(path: &Path, rows: &[WorkingsRow]) -> Result<(), CliError> {
    let mut out = String::from("model,scenario,variable,method,score\n");
    for row in rows {
        out.push_str(&csv_field(&row.model));
        out.push(',');
        out.push_str(&csv_field(&row.scenario));
        out.push(',');
        out.push_str(&csv_field(&row.variable));
        out.push(',');
        out.push_str(&csv_field(&row.method));
        out.push(',');
        out.push_str(&format_score(row.score));
        out.push('\n');
    }
    fs::write(path, out)
        .map_err(|source| CliError::io(format!("failed to write '{}'", path.display()), source))
}
