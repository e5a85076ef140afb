use anyhow::{anyhow, bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use serde_json::{Map, Value as JsonValue};

use std::cell::Cell;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::conditions::{
    ConditionStateManager, ConditionsEvaluationResult, ConditionsManager, StaticMediaQueries,
};
use crate::config;

use super::exit_codes;
use super::output::{self, CheckData, EvaluationEvent, EvaluationRecord, OutputMode};

/// reserved key in replay input that flips media queries
const MEDIA_KEY: &str = "$media";

#[derive(Parser)]
#[command(name = "condwatch")]
#[command(about = "Evaluate condition lists against a stream of state changes")]
#[command(version)]
pub struct Cli {
    /// Path to conditions file (overrides CONDWATCH_CONFIG env var and default location)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Output in JSON format (auto-enabled when stdout is piped)
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Force text output even when stdout is piped
    #[arg(long, global = true, conflicts_with = "json")]
    pub no_json: bool,

    /// Suppress all output on success (errors still go to stderr)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log evaluation details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Verify a conditions file
    Check {
        /// Conditions file (defaults to --config, CONDWATCH_CONFIG, then ~/.condwatch/conditions.json5)
        file: Option<String>,
    },

    /// Replay JSON lines of state patches through a conditions list
    Replay {
        /// Conditions file (defaults to --config, CONDWATCH_CONFIG, then ~/.condwatch/conditions.json5)
        file: Option<String>,

        /// Read state patches from a file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Set a media query's initial match state (QUERY=true|false), repeatable
        #[arg(long = "media", value_name = "QUERY=BOOL", value_parser = parse_media_flag)]
        media: Vec<(String, bool)>,
    },

    /// Print shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn execute(cli: Cli) -> Result<()> {
    let output_mode = OutputMode::from_flags(cli.json, cli.no_json, cli.quiet);

    match cli.command {
        Commands::Check { file } => {
            let path = config::get_config_path(file.as_deref().or(cli.config.as_deref()))?;
            check(&path, output_mode)
        }

        Commands::Replay { file, input, media } => {
            let path = config::get_config_path(file.as_deref().or(cli.config.as_deref()))?;
            replay(&path, input.as_deref(), &media, output_mode)
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "condwatch", &mut io::stdout());
            Ok(())
        }
    }
}

fn check(path: &Path, output_mode: OutputMode) -> Result<()> {
    let errors = match config::verify(path) {
        Ok(errors) => errors,
        Err(e) => fail(output_mode, exit_codes::CONFIG_ERROR, &format!("{:#}", e)),
    };

    if errors.is_empty() {
        if output_mode.is_json() {
            let conditions = config::read(path)?.conditions.len();
            output::print_json(&CheckData {
                path: path.display().to_string(),
                valid: true,
                conditions,
                errors: Vec::new(),
            });
        } else if !output_mode.is_quiet() {
            println!("✓ Conditions are valid: {}", path.display());
        }
        return Ok(());
    }

    let message = format!(
        "conditions file has {} error(s): {}",
        errors.len(),
        path.display()
    );

    if output_mode.is_json() {
        output::print_json_error_with_details(exit_codes::CONFIG_ERROR, &message, errors);
    } else {
        eprintln!("✗ {}", message);
        eprintln!();
        for error in &errors {
            eprintln!("  - {}", error);
        }
    }
    std::process::exit(exit_codes::CONFIG_ERROR);
}

fn replay(
    path: &Path,
    input: Option<&Path>,
    media_flags: &[(String, bool)],
    output_mode: OutputMode,
) -> Result<()> {
    let loaded = match config::load(path) {
        Ok(loaded) => loaded,
        Err(e) => fail(output_mode, exit_codes::CONFIG_ERROR, &format!("{:#}", e)),
    };

    let reader: Box<dyn BufRead> = match input {
        Some(input) => {
            let file = match File::open(input) {
                Ok(file) => file,
                Err(e) => fail(
                    output_mode,
                    exit_codes::INPUT_NOT_FOUND,
                    &format!("failed to open input {}: {}", input.display(), e),
                ),
            };
            Box::new(BufReader::new(file))
        }
        None => Box::new(io::stdin().lock()),
    };

    let media = Rc::new(StaticMediaQueries::new());
    for (query, matches) in loaded.file.media_queries.iter() {
        media.set_matches(query, *matches)?;
    }
    for (query, matches) in media_flags {
        media.set_matches(query, *matches)?;
    }

    let source = Rc::new(ConditionStateManager::new());
    if let Some(initial) = &loaded.file.initial_state {
        source
            .apply_patch(initial)
            .context("Failed to apply initial_state")?;
    }

    let manager = match ConditionsManager::builder(loaded.conditions)
        .state_source(source.clone())
        .media_queries(media.clone())
        .build()
    {
        Ok(manager) => manager,
        Err(e) => fail(output_mode, exit_codes::EVALUATION_ERROR, &e.to_string()),
    };

    if loaded.file.settings.print_initial {
        let evaluation = manager.get_evaluation();
        output::print_record(
            output_mode,
            &EvaluationRecord::new(EvaluationEvent::Initial, None, &evaluation),
        );
    }

    let current_line = Rc::new(Cell::new(0usize));
    let line_for_listener = Rc::clone(&current_line);
    manager.add_listener(Rc::new(move |evaluation: &ConditionsEvaluationResult| {
        let record =
            EvaluationRecord::new(EvaluationEvent::Change, Some(line_for_listener.get()), evaluation);
        output::print_record(output_mode, &record);
    }));

    for (index, line) in reader.lines().enumerate() {
        let number = index + 1;
        let line = line.with_context(|| format!("Failed to read input line {}", number))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        current_line.set(number);
        if let Err(e) = apply_line(trimmed, &source, &media) {
            fail(
                output_mode,
                exit_codes::EVALUATION_ERROR,
                &format!("line {}: {:#}", number, e),
            );
        }
    }

    let evaluation = manager.get_evaluation();
    output::print_record(
        output_mode,
        &EvaluationRecord::new(EvaluationEvent::Final, None, &evaluation),
    );

    manager.destroy();
    Ok(())
}

/// apply one replay input line: media query flips first, then the state patch
fn apply_line(
    line: &str,
    source: &ConditionStateManager,
    media: &StaticMediaQueries,
) -> Result<()> {
    let value: JsonValue = serde_json::from_str(line).context("invalid JSON")?;
    let JsonValue::Object(mut patch) = value else {
        bail!("expected a JSON object");
    };

    if let Some(flips) = patch.remove(MEDIA_KEY) {
        for (query, matches) in media_flips(&flips)? {
            media.set_matches(&query, matches)?;
        }
    }

    if !patch.is_empty() {
        source.apply_patch(&patch)?;
    }

    Ok(())
}

fn media_flips(value: &JsonValue) -> Result<Vec<(String, bool)>> {
    let map: &Map<String, JsonValue> = value
        .as_object()
        .ok_or_else(|| anyhow!("'{}' must be an object of query -> bool", MEDIA_KEY))?;

    map.iter()
        .map(|(query, matches)| {
            matches
                .as_bool()
                .map(|m| (query.clone(), m))
                .ok_or_else(|| anyhow!("'{}' value for '{}' must be a boolean", MEDIA_KEY, query))
        })
        .collect()
}

/// parse a `QUERY=BOOL` media flag; the query may itself contain `=`
fn parse_media_flag(value: &str) -> Result<(String, bool), String> {
    let (query, matches) = value
        .rsplit_once('=')
        .ok_or_else(|| format!("expected QUERY=BOOL, got '{}'", value))?;

    let query = query.trim();
    if query.is_empty() {
        return Err("media query must not be empty".to_string());
    }

    let matches = match matches.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        other => {
            return Err(format!(
                "invalid boolean '{}': use true/false, yes/no, 1/0, or on/off",
                other
            ))
        }
    };

    Ok((query.to_string(), matches))
}

/// report an error in the selected output mode and exit
fn fail(output_mode: OutputMode, code: i32, message: &str) -> ! {
    if output_mode.is_json() {
        output::print_json_error(code, message);
    } else {
        eprintln!("Error: {}", message);
    }
    std::process::exit(code);
}
