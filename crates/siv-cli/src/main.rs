// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use serde::Serialize;
use siv_cli::{inspect_panel, load_config, run_from_config, CliError, PanelSummary, RunOutcome};
use std::env;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

struct Cli {
    command: Command,
}

enum Command {
    Evaluate(EvaluateArgs),
    Inspect(InspectArgs),
}

#[derive(Debug, Default)]
struct EvaluateArgs {
    config: PathBuf,
    input: Option<PathBuf>,
    summary: Option<PathBuf>,
    workings: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct InspectArgs {
    input: PathBuf,
    region: Option<String>,
}

#[derive(Serialize)]
struct EvaluateOutput {
    command: &'static str,
    outcome: RunOutcome,
}

#[derive(Serialize)]
struct InspectOutput {
    command: &'static str,
    input: String,
    region: Option<String>,
    panel: PanelSummary,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Serialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        emit_structured_error(&err);
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<(), CliError> {
    let Some(cli) = parse_cli_from_env()? else {
        return Ok(());
    };

    match cli.command {
        Command::Evaluate(args) => handle_evaluate(args),
        Command::Inspect(args) => handle_inspect(args),
    }
}

fn parse_cli_from_env() -> Result<Option<Cli>, CliError> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        print_root_help();
        return Ok(None);
    }

    if matches!(args[0].as_str(), "-h" | "--help") {
        print_root_help();
        return Ok(None);
    }
    if matches!(args[0].as_str(), "-V" | "--version") {
        print_version();
        return Ok(None);
    }

    let command_name = args[0].clone();
    let rest = &args[1..];

    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print_command_help(command_name.as_str())?;
        return Ok(None);
    }
    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-V" | "--version"))
    {
        print_version();
        return Ok(None);
    }

    let command = match command_name.as_str() {
        "evaluate" => Command::Evaluate(parse_evaluate_args(rest)?),
        "inspect" => Command::Inspect(parse_inspect_args(rest)?),
        _ => {
            return Err(CliError::invalid_input(format!(
                "unknown command '{command_name}'; expected one of: evaluate, inspect"
            )));
        }
    };

    Ok(Some(Cli { command }))
}

fn parse_evaluate_args(tokens: &[String]) -> Result<EvaluateArgs, CliError> {
    let mut args = EvaluateArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--config" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.config = PathBuf::from(raw);
            }
            "--input" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.input = Some(PathBuf::from(raw));
            }
            "--summary" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.summary = Some(PathBuf::from(raw));
            }
            "--workings" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.workings = Some(PathBuf::from(raw));
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown evaluate option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    if args.config.as_os_str().is_empty() {
        return Err(CliError::invalid_input("evaluate requires --config <path>"));
    }

    Ok(args)
}

fn parse_inspect_args(tokens: &[String]) -> Result<InspectArgs, CliError> {
    let mut args = InspectArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--input" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.input = PathBuf::from(raw);
            }
            "--region" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.region = Some(raw);
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown inspect option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    if args.input.as_os_str().is_empty() {
        return Err(CliError::invalid_input("inspect requires --input <path>"));
    }

    Ok(args)
}

fn split_flag(token: &str) -> Result<(&str, Option<String>), CliError> {
    if !token.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "unexpected positional argument '{token}'; expected --flag value"
        )));
    }
    if let Some((flag, value)) = token.split_once('=') {
        return Ok((flag, Some(value.to_string())));
    }
    Ok((token, None))
}

fn take_flag_value(
    flag: &str,
    inline_value: Option<String>,
    tokens: &[String],
    idx: &mut usize,
) -> Result<String, CliError> {
    if let Some(value) = inline_value {
        return Ok(value);
    }

    *idx += 1;
    let value = tokens
        .get(*idx)
        .ok_or_else(|| CliError::invalid_input(format!("{flag} requires a value")))?;
    if value.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "{flag} requires a value, but got option '{value}'"
        )));
    }
    Ok(value.clone())
}

fn print_version() {
    println!("siv {}", env!("CARGO_PKG_VERSION"));
}

fn print_root_help() {
    println!(
        "siv {}\n\nUSAGE:\n  siv <COMMAND> [OPTIONS]\n\nCOMMANDS:\n  evaluate   Run a cross-validation described by a config JSON\n  inspect    Summarise a panel CSV without running anything\n\nGLOBAL OPTIONS:\n  -h, --help      Show help\n  -V, --version   Show version\n\nRun 'siv <COMMAND> --help' for subcommand options.",
        env!("CARGO_PKG_VERSION")
    );
}

fn print_command_help(command: &str) -> Result<(), CliError> {
    match command {
        "evaluate" => {
            println!(
                "USAGE:\n  siv evaluate --config <path> [OPTIONS]\n\nOPTIONS:\n  --config <path>     Required run configuration JSON\n  --input <path>      Override the config's input panel CSV\n  --summary <path>    Override the config's summary output path\n  --workings <path>   Override the config's workings output path"
            );
            Ok(())
        }
        "inspect" => {
            println!(
                "USAGE:\n  siv inspect --input <path> [OPTIONS]\n\nOPTIONS:\n  --input <path>      Required panel CSV\n  --region <name>     Restrict the summary to one region"
            );
            Ok(())
        }
        _ => Err(CliError::invalid_input(format!(
            "unknown command '{command}'; expected one of: evaluate, inspect"
        ))),
    }
}

fn handle_evaluate(args: EvaluateArgs) -> Result<(), CliError> {
    let mut config = load_config(args.config.as_path())?;
    if let Some(input) = args.input {
        config.input = input;
    }
    if let Some(summary) = args.summary {
        config.summary_out = summary;
    }
    if let Some(workings) = args.workings {
        config.workings_out = Some(workings);
    }

    let outcome = run_from_config(&config)?;
    print_json(&EvaluateOutput {
        command: "evaluate",
        outcome,
    })
}

fn handle_inspect(args: InspectArgs) -> Result<(), CliError> {
    let panel = inspect_panel(args.input.as_path(), args.region.as_deref())?;
    print_json(&InspectOutput {
        command: "inspect",
        input: args.input.display().to_string(),
        region: args.region,
        panel,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|source| CliError::json("failed to render output JSON", source))?;
    println!("{rendered}");
    Ok(())
}

fn emit_structured_error(err: &CliError) {
    let envelope = ErrorEnvelope {
        error: ErrorPayload {
            code: err.code().to_string(),
            message: err.to_string(),
        },
    };
    match serde_json::to_string_pretty(&envelope) {
        Ok(rendered) => eprintln!("{rendered}"),
        Err(_) => eprintln!("error ({}): {err}", err.code()),
    }
}
