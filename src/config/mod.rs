mod schema;

pub use schema::{ConditionsFile, Settings};

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::conditions::{parse_condition, parse_conditions, Condition};
use schema::RawConditionsFile;

const CONFIG_ENV_VAR: &str = "CONDWATCH_CONFIG";

/// resolve the conditions file location
///
/// priority: explicit path > `CONDWATCH_CONFIG` > `~/.condwatch/conditions.json5`
pub fn get_config_path(explicit: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(expand_path(path));
    }

    if let Ok(path) = env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Ok(expand_path(&path));
        }
    }

    Ok(dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not find home directory"))?
        .join(".condwatch")
        .join("conditions.json5"))
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

/// a conditions file with its conditions parsed
#[derive(Debug, Clone)]
pub struct LoadedConditions {
    pub path: PathBuf,
    pub file: ConditionsFile,
    pub conditions: Vec<Condition>,
}

/// read a conditions file without interpreting its conditions
pub fn read(path: &Path) -> Result<ConditionsFile> {
    if !path.exists() {
        return Err(anyhow!("config file not found: {}", path.display()));
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let raw: RawConditionsFile = json5::from_str(&content)
        .map_err(|e| anyhow!("invalid JSON5 in {}: {}", path.display(), e))?;

    Ok(raw.into())
}

/// read a conditions file and parse its conditions
pub fn load(path: &Path) -> Result<LoadedConditions> {
    let file = read(path)?;

    let conditions = parse_conditions(&serde_json::Value::Array(file.conditions.clone()))
        .with_context(|| format!("Failed to parse conditions in {}", path.display()))?;

    tracing::debug!(
        path = %path.display(),
        count = conditions.len(),
        "loaded conditions"
    );

    Ok(LoadedConditions {
        path: path.to_path_buf(),
        file,
        conditions,
    })
}

/// Verify a conditions file and return a list of problems
pub fn verify(path: &Path) -> Result<Vec<String>> {
    let file = read(path)?;
    let mut errors = Vec::new();

    for (i, item) in file.conditions.iter().enumerate() {
        let prefix = format!("conditions[{}]", i);

        match parse_condition(item) {
            Ok(condition) => {
                if let Err(e) = validate_condition(&condition) {
                    errors.push(format!("{}: {}", prefix, e));
                }
            }
            Err(e) => errors.push(format!("{}: {}", prefix, e.message)),
        }
    }

    for query in file.media_queries.keys() {
        if query.trim().is_empty() {
            errors.push("media_queries: empty media query".to_string());
        }
    }

    Ok(errors)
}

/// checks a condition could ever match as configured
fn validate_condition(condition: &Condition) -> Result<(), String> {
    match condition {
        Condition::NumericState(c) => {
            if let (Some(above), Some(below)) = (c.above, c.below) {
                if above >= below {
                    return Err(format!(
                        "numeric_state for '{}': above ({}) must be less than below ({})",
                        c.entity, above, below
                    ));
                }
            }
        }
        Condition::UserAgent(c) => {
            if let Some(pattern) = &c.user_agent_re {
                if let Err(e) = Regex::new(pattern) {
                    return Err(format!("invalid user_agent_re '{}': {}", pattern, e));
                }
            }
        }
        Condition::Triggered(c) if c.triggered.is_empty() => {
            return Err("triggered requires at least one camera".to_string());
        }
        Condition::User(c) if c.users.is_empty() => {
            return Err("user requires at least one user id".to_string());
        }
        Condition::Screen(c) if c.media_query.trim().is_empty() => {
            return Err("screen requires a non-empty media_query".to_string());
        }
        _ => {}
    }
    Ok(())
}
