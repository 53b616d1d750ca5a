use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    conversation::{HistoryPolicy, TemperatureSource, FIXED_GENERATION_TEMPERATURE},
    errors::Error,
    Result,
};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-instruct";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Typed runtime configuration.
///
/// Credentials are deliberately absent: they come from the credentials table
/// (see `credentials`), never from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    // Storage
    pub data_dir: PathBuf,

    // Completion backend
    pub openai_model: String,
    pub openai_base_url: String,
    pub request_timeout: Duration,

    // Conversation behavior
    pub history_policy: HistoryPolicy,
    pub temperature_source: TemperatureSource,

    // Telegram UI
    pub show_temperature_button: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            openai_model: DEFAULT_MODEL.to_string(),
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(60),
            history_policy: HistoryPolicy::KeepAll,
            temperature_source: TemperatureSource::Fixed(FIXED_GENERATION_TEMPERATURE),
            show_temperature_button: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        apply_dotenv(Path::new(".env"));
        let cfg = Self::from_lookup(|key| env::var(key).ok())?;
        fs::create_dir_all(&cfg.data_dir)?;
        Ok(cfg)
    }

    /// Build a config from an arbitrary key lookup (the process env in `load`).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let data_dir = lookup("DATA_DIR")
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let openai_model = lookup("OPENAI_MODEL")
            .and_then(non_empty)
            .unwrap_or(defaults.openai_model);
        let openai_base_url = lookup("OPENAI_BASE_URL")
            .and_then(non_empty)
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.openai_base_url);

        let request_timeout = match lookup("REQUEST_TIMEOUT_SECS").and_then(non_empty) {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|_| {
                    Error::Config(format!("REQUEST_TIMEOUT_SECS is not a number: {raw}"))
                })?;
                if secs == 0 {
                    return Err(Error::Config(
                        "REQUEST_TIMEOUT_SECS must be greater than zero".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
            None => defaults.request_timeout,
        };

        let history_policy = match lookup("HISTORY_MAX_TURNS").and_then(non_empty) {
            Some(raw) => {
                let n = raw.trim().parse::<usize>().map_err(|_| {
                    Error::Config(format!("HISTORY_MAX_TURNS is not a number: {raw}"))
                })?;
                HistoryPolicy::LastTurns(n)
            }
            None => HistoryPolicy::KeepAll,
        };

        let temperature_source = if parse_bool(lookup("USE_USER_TEMPERATURE")).unwrap_or(false) {
            TemperatureSource::PerUser
        } else {
            defaults.temperature_source
        };

        let show_temperature_button =
            parse_bool(lookup("SHOW_TEMPERATURE_BUTTON")).unwrap_or(false);

        Ok(Self {
            data_dir,
            openai_model,
            openai_base_url,
            request_timeout,
            history_policy,
            temperature_source,
            show_temperature_button,
        })
    }
}

/// Export `KEY=value` pairs from an optional `.env` file. Variables already set
/// in the process environment win.
fn apply_dotenv(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };
    for (key, value) in dotenv_entries(&contents) {
        if env::var_os(&key).is_none() {
            env::set_var(key, value);
        }
    }
}

/// Parse `.env` text. Blank lines, `#` comments and lines without a key are
/// skipped; an `export ` prefix and one layer of matching quotes are dropped.
fn dotenv_entries(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), unquote(value.trim()).to_string()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(q)
            .and_then(|rest| rest.strip_suffix(q))
        {
            return inner;
        }
    }
    value
}

fn parse_bool(v: Option<String>) -> Option<bool> {
    v.map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
