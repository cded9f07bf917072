// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! File-to-file test of the batch path: panel CSV in, summary and workings
//! CSVs out.

use siv_cli::{load_config, run_from_config};
use std::fs;

const PANEL_CSV: &str = "\
Model,Scenario,Region,Variable,Unit,2020,2050,2060\n\
m1,flat,World,Emissions|CO2,Mt CO2/yr,5.0,5.0,5.0\n\
m1,rising,World,Emissions|CO2,Mt CO2/yr,10.0,12.0,14.0\n\
m1,falling,World,Emissions|CO2,Mt CO2/yr,20.0,18.0,16.0\n\
m1,other-region,Elsewhere,Emissions|CO2,Mt CO2/yr,1.0,2.0,3.0\n";

fn config_json(input: &str, summary: &str, workings: &str) -> String {
    format!(
        r#"{{
            "input": {input:?},
            "region": "World",
            "leaders": ["Emissions|CO2"],
            "years": {{"start": 2020, "stop": 2060, "step": 10}},
            "cut_year": 2050,
            "strategies": [{{"name": "latest", "kind": "latest_value"}}],
            "summary_out": {summary:?},
            "workings_out": {workings:?}
        }}"#
    )
}

#[test]
fn evaluate_writes_summary_and_workings_files() {
    let dir = tempfile::tempdir().expect("temp dir should create");
    let panel_path = dir.path().join("panel.csv");
    let summary_path = dir.path().join("summary.csv");
    let workings_path = dir.path().join("workings.csv");
    let config_path = dir.path().join("run.json");

    fs::write(&panel_path, PANEL_CSV).expect("panel should write");
    fs::write(
        &config_path,
        config_json(
            panel_path.to_str().expect("utf-8 path"),
            summary_path.to_str().expect("utf-8 path"),
            workings_path.to_str().expect("utf-8 path"),
        ),
    )
    .expect("config should write");

    let config = load_config(&config_path).expect("config should load");
    let outcome = run_from_config(&config).expect("run should succeed");

    // The Elsewhere row is scoped out, so three folds remain; every fold has
    // training data and ground truth, so every cell is scored.
    assert_eq!(outcome.folds, 3);
    assert_eq!(outcome.scored_cells, 3);

    let summary = fs::read_to_string(&summary_path).expect("summary should exist");
    let mut lines = summary.lines();
    assert_eq!(lines.next(), Some("variable,latest"));
    let data = lines.next().expect("one summary row");
    assert!(data.starts_with("Emissions|CO2,"));
    let score: f64 = data
        .split(',')
        .nth(1)
        .expect("score cell present")
        .parse()
        .expect("score is numeric");
    assert!(score >= 0.0);

    let workings = fs::read_to_string(&workings_path).expect("workings should exist");
    let lines: Vec<&str> = workings.lines().collect();
    assert_eq!(lines[0], "model,scenario,variable,method,score");
    assert_eq!(lines.len(), 4);
    assert!(lines.iter().skip(1).all(|line| line.starts_with("m1,")));

    // The flat scenario is reconstructed exactly by holding its last value.
    let flat_line = lines
        .iter()
        .find(|line| line.contains(",flat,"))
        .expect("flat fold present");
    assert!(flat_line.ends_with(",0"));
}

#[test]
fn missing_input_file_reports_io_error() {
    let dir = tempfile::tempdir().expect("temp dir should create");
    let config_path = dir.path().join("run.json");
    fs::write(
        &config_path,
        config_json(
            dir.path().join("absent.csv").to_str().expect("utf-8 path"),
            dir.path().join("s.csv").to_str().expect("utf-8 path"),
            dir.path().join("w.csv").to_str().expect("utf-8 path"),
        ),
    )
    .expect("config should write");

    let config = load_config(&config_path).expect("config should load");
    let err = run_from_config(&config).expect_err("absent input must fail");
    assert_eq!(err.code(), "io_error");
}
