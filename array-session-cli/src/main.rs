use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};
use color_eyre::eyre::{Report, Result, WrapErr, eyre};
use serde_json::Value;

use array_session::{
    ArraySession, DocumentFormat, OutputDestination, OutputOptions, SessionOptions, emit,
    event_value, parse_document_str, parse_session_input,
};

mod logging;
mod script;

use script::{Action, ReplayHost, pending_summary, replay};

#[derive(Debug, Parser)]
#[command(
    name = "array-session",
    version,
    about = "Replay scripted edits against an array field and emit the result"
)]
struct Cli {
    /// Session input spec: file path, inline JSON, or "-" for stdin
    #[arg(short = 'i', long = "input", value_name = "SPEC")]
    input: String,

    /// Action script spec: file path or inline JSON list of actions
    #[arg(short = 's', long = "script", value_name = "SPEC")]
    script: Option<String>,

    /// Output destinations ("-" writes to stdout). Accepts multiple values per flag use.
    #[arg(short = 'o', long = "output", value_name = "DEST", num_args = 1.., action = ArgAction::Append)]
    outputs: Vec<String>,

    /// Meta type stamped on every submitted item
    #[arg(long = "meta-type", value_name = "TYPE")]
    meta_type: Option<String>,

    /// Emit compact JSON rather than pretty formatting
    #[arg(long = "no-pretty")]
    no_pretty: bool,

    /// Raise log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug)]
enum InputSource {
    File(PathBuf),
    Stdin,
    Inline(String),
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if cli.input == "-" && cli.script.as_deref() == Some("-") {
        return Err(eyre!(
            "cannot read input and script from stdin simultaneously; provide inline content or files"
        ));
    }

    let input_value = load_value(&cli.input, "input")?;
    let input = parse_session_input(&input_value).map_err(Report::msg)?;
    let actions = match cli.script.as_deref() {
        Some(spec) => {
            let value = load_value(spec, "script")?;
            serde_json::from_value::<Vec<Action>>(value).wrap_err("failed to read action script")?
        }
        None => Vec::new(),
    };

    let mut options = SessionOptions::default();
    if let Some(meta_type) = cli.meta_type.as_ref() {
        options = options.with_meta_type(meta_type.clone());
    }

    let mut session = ArraySession::new(input, options, ReplayHost::default());
    session.mount()?;
    let applied = replay(&mut session, &actions)?;
    tracing::info!(applied, total = actions.len(), "replayed actions");

    let result = match session.outcome() {
        Some(event) => event_value(event).map_err(Report::msg)?,
        None => pending_summary(&session),
    };
    emit(&result, &build_output_options(&cli)).map_err(Report::msg)?;
    Ok(())
}

fn load_value(spec: &str, label: &str) -> Result<Value> {
    let (contents, format) = match resolve_source(spec) {
        InputSource::Stdin => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .wrap_err_with(|| format!("failed to read {label} from stdin"))?;
            (buffer, DocumentFormat::Json)
        }
        InputSource::File(path) => {
            let contents = fs::read_to_string(&path)
                .wrap_err_with(|| format!("failed to read {label} file {}", path.display()))?;
            (contents, DocumentFormat::from_path(&path))
        }
        InputSource::Inline(raw) => (raw, DocumentFormat::Json),
    };
    parse_document_str(&contents, format)
        .map_err(Report::msg)
        .wrap_err_with(|| format!("invalid {label} document"))
}

fn resolve_source(spec: &str) -> InputSource {
    if spec == "-" {
        return InputSource::Stdin;
    }
    let path = Path::new(spec);
    if path.exists() {
        InputSource::File(path.to_path_buf())
    } else {
        InputSource::Inline(spec.to_string())
    }
}

fn build_output_options(cli: &Cli) -> OutputOptions {
    let destinations = if cli.outputs.is_empty() {
        vec![OutputDestination::Stdout]
    } else {
        cli.outputs
            .iter()
            .map(|dest| {
                if dest == "-" {
                    OutputDestination::Stdout
                } else {
                    OutputDestination::file(dest)
                }
            })
            .collect()
    };
    let format = cli
        .outputs
        .iter()
        .find(|dest| dest.as_str() != "-")
        .map(|dest| DocumentFormat::from_path(Path::new(dest)))
        .unwrap_or(DocumentFormat::Json);
    OutputOptions::new(format)
        .with_pretty(!cli.no_pretty)
        .with_destinations(destinations)
}
