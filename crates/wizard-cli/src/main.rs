mod sink;
mod wizard;

use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::Value;
use sink::CliSink;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use wizard::{AnswerParseError, PromptContext, Verbosity, WizardPresenter, parse_answer};
use wizard_spec::{
    AdvanceOutcome, FormSpec, GeographyLookup, Record, StaticGeography, Submission,
    SubmissionSink, TimezoneOptions, UsageError, Wizard, build_step_view, is_absent,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const DEFAULT_SPEC: &str = include_str!("../data/onboarding.json");
const DEFAULT_GEOGRAPHY: &str = include_str!("../data/geography.json");
const OUTPUT_ENV: &str = "ONBOARD_WIZARD_OUTPUT";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Text-based onboarding wizard",
    long_about = "Runs a multi-step onboarding form in the terminal, replays answer files and checks form definitions"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the wizard interactively.
    Run {
        /// Path to a FormSpec JSON file (defaults to the built-in onboarding form).
        #[arg(long, value_name = "SPEC")]
        spec: Option<PathBuf>,
        /// Path to a geography JSON dataset used for country and timezone hints.
        #[arg(long, value_name = "GEO")]
        geo: Option<PathBuf>,
        /// File that receives submissions, one JSON line each (defaults to ONBOARD_WIZARD_OUTPUT or stdout).
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Show verbose output (status, visible fields, debug logs).
        #[arg(long, alias = "debug")]
        verbose: bool,
        /// Print the accumulated answers after every step.
        #[arg(long)]
        answers_json: bool,
        /// Field holding the selected country.
        #[arg(long, default_value = "country")]
        country_field: String,
        /// Field holding the selected timezone.
        #[arg(long, default_value = "timezone")]
        timezone_field: String,
    },
    /// Feed an answers file through the wizard step by step.
    Replay {
        /// JSON object mapping field ids to values.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
        /// Path to a FormSpec JSON file (defaults to the built-in onboarding form).
        #[arg(long, value_name = "SPEC")]
        spec: Option<PathBuf>,
    },
    /// Validate a form definition without running it.
    Check {
        /// Path to a FormSpec JSON file (defaults to the built-in onboarding form).
        #[arg(long, value_name = "SPEC")]
        spec: Option<PathBuf>,
    },
    /// Print the JSON Schema of the form definition format.
    Schema,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let verbose = matches!(cli.command, Command::Run { verbose: true, .. });
    init_tracing(verbose);

    match cli.command {
        Command::Run {
            spec,
            geo,
            out,
            verbose,
            answers_json,
            country_field,
            timezone_field,
        } => {
            let mut wizard = Wizard::new(load_spec(spec.as_deref())?)?;
            let geography = load_geography(geo.as_deref())?;
            let mut sink = CliSink::from_path(resolve_output(out));
            let mut presenter =
                WizardPresenter::new(Verbosity::from_verbose(verbose), answers_json);
            let fields = GeoFields {
                country: country_field,
                timezone: timezone_field,
            };
            let stdin = io::stdin();
            let mut input = stdin.lock();
            run_session(
                &mut wizard,
                &geography,
                &fields,
                &mut input,
                &mut presenter,
                &mut sink,
            )
        }
        Command::Replay { answers, spec } => run_replay(spec.as_deref(), &answers),
        Command::Check { spec } => run_check(spec.as_deref()),
        Command::Schema => {
            let schema = schemars::schema_for!(FormSpec);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

fn load_spec(path: Option<&Path>) -> CliResult<FormSpec> {
    let contents = match path {
        Some(path) => fs::read_to_string(path)?,
        None => DEFAULT_SPEC.to_string(),
    };
    Ok(serde_json::from_str(&contents)?)
}

fn load_geography(path: Option<&Path>) -> CliResult<StaticGeography> {
    let contents = match path {
        Some(path) => fs::read_to_string(path)?,
        None => DEFAULT_GEOGRAPHY.to_string(),
    };
    Ok(StaticGeography::from_json(&contents)?)
}

fn resolve_output(out: Option<PathBuf>) -> Option<PathBuf> {
    out.or_else(|| env::var_os(OUTPUT_ENV).map(PathBuf::from))
}

fn run_check(spec_path: Option<&Path>) -> CliResult<()> {
    let wizard = Wizard::new(load_spec(spec_path)?)?;
    println!(
        "Form '{}' is valid: {} steps, {} fields, {} rules",
        wizard.form_id(),
        wizard.steps().content_steps(),
        wizard.schema().fields().len(),
        wizard.schema().rules().len()
    );
    Ok(())
}

/// Result of feeding an answers file through the wizard.
#[derive(Debug)]
enum ReplayOutcome {
    Completed(Submission),
    Blocked {
        step: usize,
        messages: BTreeMap<String, String>,
    },
}

fn run_replay(spec_path: Option<&Path>, answers_path: &Path) -> CliResult<()> {
    let mut wizard = Wizard::new(load_spec(spec_path)?)?;
    let answers: Record = serde_json::from_str(&fs::read_to_string(answers_path)?)?;

    match replay_answers(&mut wizard, &answers)? {
        ReplayOutcome::Completed(submission) => {
            println!("{}", submission.to_json_pretty()?);
            Ok(())
        }
        ReplayOutcome::Blocked { step, messages } => {
            println!("Step {} is invalid:", step);
            for (field, message) in messages {
                println!(" - {}: {}", field, message);
            }
            Err("validation failed".into())
        }
    }
}

fn replay_answers(wizard: &mut Wizard, answers: &Record) -> Result<ReplayOutcome, UsageError> {
    for key in answers.keys() {
        if wizard.steps().owner_of(key).is_none() {
            tracing::warn!(field = %key, "ignoring answer for unknown field");
        }
    }

    while !wizard.is_terminal() {
        let step = wizard.current_step();
        let owned = wizard.steps().fields(step).to_vec();
        for field in &owned {
            if let Some(value) = answers.get(field) {
                wizard.set_value(field, value.clone())?;
            }
        }
        if let AdvanceOutcome::Blocked { .. } = wizard.advance()? {
            let messages = wizard
                .errors()
                .iter()
                .map(|(field, error)| (field.clone(), error.message.clone()))
                .collect();
            return Ok(ReplayOutcome::Blocked { step, messages });
        }
    }

    Ok(ReplayOutcome::Completed(wizard.submission()?))
}

/// Fields that drive the country and timezone hints.
struct GeoFields {
    country: String,
    timezone: String,
}

/// What the user asked for while filling a step.
#[derive(Debug, PartialEq, Eq)]
enum StepAction {
    Advance,
    Back,
    Quit,
}

fn run_session<R: BufRead>(
    wizard: &mut Wizard,
    geography: &dyn GeographyLookup,
    fields: &GeoFields,
    input: &mut R,
    presenter: &mut WizardPresenter,
    sink: &mut CliSink,
) -> CliResult<()> {
    let mut timezones = TimezoneOptions::new();

    loop {
        while !wizard.is_terminal() {
            presenter.show_step(&build_step_view(wizard));
            match fill_step(wizard, geography, fields, &mut timezones, input, presenter)? {
                StepAction::Back => {
                    wizard.back();
                    continue;
                }
                StepAction::Quit => return Err("wizard aborted by user".into()),
                StepAction::Advance => {}
            }
            match wizard.advance()? {
                AdvanceOutcome::Blocked { .. } => {
                    let messages = wizard
                        .errors()
                        .iter()
                        .map(|(field, error)| (field.clone(), error.message.clone()))
                        .collect();
                    presenter.show_blocked(&messages);
                }
                _ => presenter.show_answers(wizard.accumulated()),
            }
        }

        let submission = wizard.submission()?;
        presenter.show_completion(&build_step_view(wizard), &submission);
        sink.submit(&submission)?;

        if !prompt_bool(input, "Start over?", false)? {
            return Ok(());
        }
        wizard.restart()?;
    }
}

/// Prompts every visible field of the current step. Visibility is recomputed
/// after each answer, so fields revealed by an answer are asked in turn.
fn fill_step<R: BufRead>(
    wizard: &mut Wizard,
    geography: &dyn GeographyLookup,
    fields: &GeoFields,
    timezones: &mut TimezoneOptions,
    input: &mut R,
    presenter: &WizardPresenter,
) -> CliResult<StepAction> {
    let mut asked = BTreeSet::new();

    loop {
        let next = wizard
            .visible_fields()
            .into_iter()
            .find(|field| !asked.contains(field));
        let Some(field) = next else {
            if asked.is_empty() {
                // Nothing to ask; wait for confirmation before moving on.
                read_line(input)?;
            }
            return Ok(StepAction::Advance);
        };
        asked.insert(field.clone());

        if let Some(action) =
            prompt_field(wizard, &field, geography, fields, timezones, input, presenter)?
        {
            return Ok(action);
        }
    }
}

fn prompt_field<R: BufRead>(
    wizard: &mut Wizard,
    field: &str,
    geography: &dyn GeographyLookup,
    fields: &GeoFields,
    timezones: &mut TimezoneOptions,
    input: &mut R,
    presenter: &WizardPresenter,
) -> CliResult<Option<StepAction>> {
    loop {
        let view = build_step_view(wizard);
        let render = view
            .fields
            .iter()
            .find(|candidate| candidate.id == field)
            .ok_or_else(|| format!("field '{}' is not on this step", field))?;
        let mut prompt = PromptContext::new(render);
        if field == fields.country {
            prompt = prompt.with_suggestions(country_names(geography));
        } else if field == fields.timezone
            && let Some(country) = selected_country(wizard, &fields.country)
        {
            if timezones.country() != Some(country.as_str()) {
                timezones.refresh(geography, &country);
            }
            prompt = prompt.with_timezones(timezones.options());
        }
        presenter.show_prompt(&prompt);
        print!("> ");
        io::stdout().flush()?;

        let line = read_line(input)?.ok_or("unexpected end of input")?;
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case(":back") {
            return Ok(Some(StepAction::Back));
        }
        if trimmed.eq_ignore_ascii_case(":quit") {
            return Ok(Some(StepAction::Quit));
        }

        if trimmed.is_empty() {
            if is_absent(wizard.values().get(field)) {
                wizard.clear_value(field)?;
            }
        } else {
            let (kind, choices) = match wizard.schema().field(field) {
                Some(spec) => (spec.kind, spec.choices.clone()),
                None => return Err(UsageError::UnknownField(field.to_string()).into()),
            };
            match parse_answer(kind, choices.as_deref(), trimmed) {
                Ok(value) => wizard.set_value(field, value)?,
                Err(err) => {
                    presenter.show_parse_error(&err);
                    continue;
                }
            }
        }

        if field == fields.country
            && let Some(country) = selected_country(wizard, &fields.country)
        {
            timezones.refresh(geography, &country);
        }

        match wizard.touch(field)? {
            Some(error) => presenter.show_field_error(&error.message),
            None => return Ok(None),
        }
    }
}

fn selected_country(wizard: &Wizard, country_field: &str) -> Option<String> {
    wizard
        .live_view()
        .get(country_field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|country| !country.is_empty())
        .map(String::from)
}

fn country_names(geography: &dyn GeographyLookup) -> Vec<String> {
    match geography.list_countries() {
        Ok(countries) => countries.into_iter().map(|country| country.name).collect(),
        Err(err) => {
            tracing::warn!(error = %err, "country lookup failed");
            Vec::new()
        }
    }
}

/// Reads one line, returning `None` at end of input.
fn read_line<R: BufRead>(input: &mut R) -> CliResult<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn prompt_bool<R: BufRead>(input: &mut R, prompt: &str, default: bool) -> CliResult<bool> {
    let suffix = if default { "Y/n" } else { "y/N" };
    loop {
        print!("{} [{}]: ", prompt, suffix);
        io::stdout().flush()?;
        let Some(line) = read_line(input)? else {
            return Ok(default);
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(default);
        }
        match parse_answer(wizard_spec::FieldType::Boolean, None, trimmed) {
            Ok(Value::Bool(flag)) => return Ok(flag),
            Ok(_) => {}
            Err(AnswerParseError { user_message, .. }) => println!("{}", user_message),
        }
    }
}
