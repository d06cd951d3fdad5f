use chrono::Utc;
use chrono_tz::Tz;
use cron::Schedule;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

use crate::journal::prompts::DEFAULT_REMINDER;
use crate::journal::{SweepHours, SweepSettings};

/// Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
static TOKEN_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+:[A-Za-z0-9_-]+$").expect("valid token regex"));

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config file '{}': {source}", path.display())]
    ParseJson { path: PathBuf, source: serde_json::Error },
    #[error("invalid tick_cron '{expr}': {source}")]
    InvalidCron { expr: String, source: cron::error::Error },
    #[error("config validation error: {0}")]
    Validation(String),
}

#[derive(Deserialize)]
struct ConfigFile {
    /// Falls back to TELEGRAM_TOKEN when empty
    #[serde(default)]
    telegram_bot_token: String,
    /// Falls back to GEMINI_API_KEY when empty
    #[serde(default)]
    gemini_api_key: String,
    #[serde(default = "default_gemini_model")]
    gemini_model: String,
    /// Directory for the database and logs. Defaults to current directory.
    data_dir: Option<String>,
    /// IANA zone that defines where a calendar day starts.
    #[serde(default = "default_timezone")]
    timezone: String,
    /// 7-field cron expression (sec min hour day month dow year).
    #[serde(default = "default_tick_cron")]
    tick_cron: String,
    #[serde(default = "default_tick_debounce_ms")]
    tick_debounce_ms: u64,
    #[serde(default = "default_remind_hour")]
    remind_hour_utc: u32,
    #[serde(default = "default_summarize_hour")]
    summarize_hour_utc: u32,
    #[serde(default = "default_reminder_interval_ms")]
    reminder_interval_ms: u64,
    #[serde(default = "default_summarize_interval_ms")]
    summarize_interval_ms: u64,
    #[serde(default = "default_sweep_concurrency")]
    sweep_concurrency: usize,
    #[serde(default = "default_history_limit")]
    history_limit: usize,
    reminder_text: Option<String>,
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_timezone() -> String {
    "Asia/Singapore".to_string()
}

fn default_tick_cron() -> String {
    "0 0 * * * * *".to_string()
}

fn default_tick_debounce_ms() -> u64 {
    2000
}

fn default_remind_hour() -> u32 {
    14
}

fn default_summarize_hour() -> u32 {
    20
}

fn default_reminder_interval_ms() -> u64 {
    100
}

fn default_summarize_interval_ms() -> u64 {
    1000
}

fn default_sweep_concurrency() -> usize {
    8
}

fn default_history_limit() -> usize {
    30
}

pub struct Config {
    pub telegram_bot_token: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    /// Holds journie.db and logs/.
    pub data_dir: PathBuf,
    pub timezone: Tz,
    pub tick_schedule: Schedule,
    pub tick_debounce: Duration,
    pub sweep_hours: SweepHours,
    pub reminder_interval: Duration,
    pub summarize_interval: Duration,
    pub sweep_concurrency: usize,
    pub history_limit: usize,
    pub reminder_text: String,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |name| std::env::var(name).ok())
    }

    /// Load with `env` resolving variables for secrets left empty in the file.
    pub fn load_with_env<P, E>(path: P, env: E) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        E: Fn(&str) -> Option<String>,
    {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        let telegram_bot_token = secret(file.telegram_bot_token, "TELEGRAM_TOKEN", &env);
        if telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        if !TOKEN_FORMAT.is_match(&telegram_bot_token) {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }

        let gemini_api_key = secret(file.gemini_api_key, "GEMINI_API_KEY", &env);
        if gemini_api_key.is_empty() {
            return Err(ConfigError::Validation("gemini_api_key is required".into()));
        }
        if file.gemini_model.trim().is_empty() {
            return Err(ConfigError::Validation("gemini_model must not be empty".into()));
        }

        let timezone = file
            .timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Validation(format!("unknown timezone '{}'", file.timezone)))?;

        let tick_schedule = Schedule::from_str(&file.tick_cron)
            .map_err(|e| ConfigError::InvalidCron { expr: file.tick_cron.clone(), source: e })?;
        let tick_debounce = Duration::from_millis(file.tick_debounce_ms);
        if let Some(gap) = shortest_gap(&tick_schedule)
            && tick_debounce >= gap
        {
            return Err(ConfigError::Validation(format!(
                "tick_debounce_ms ({}) must be shorter than the tick_cron interval ({}ms)",
                file.tick_debounce_ms,
                gap.as_millis()
            )));
        }

        for (name, hour) in [
            ("remind_hour_utc", file.remind_hour_utc),
            ("summarize_hour_utc", file.summarize_hour_utc),
        ] {
            if hour > 23 {
                return Err(ConfigError::Validation(format!("{name} must be 0-23, got {hour}")));
            }
        }
        if file.remind_hour_utc == file.summarize_hour_utc {
            return Err(ConfigError::Validation(
                "remind_hour_utc and summarize_hour_utc must differ".into()
            ));
        }
        if file.sweep_concurrency == 0 {
            return Err(ConfigError::Validation("sweep_concurrency must be at least 1".into()));
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            telegram_bot_token,
            gemini_api_key,
            gemini_model: file.gemini_model,
            data_dir,
            timezone,
            tick_schedule,
            tick_debounce,
            sweep_hours: SweepHours {
                remind: file.remind_hour_utc,
                summarize: file.summarize_hour_utc,
            },
            reminder_interval: Duration::from_millis(file.reminder_interval_ms),
            summarize_interval: Duration::from_millis(file.summarize_interval_ms),
            sweep_concurrency: file.sweep_concurrency,
            history_limit: file.history_limit,
            reminder_text: file.reminder_text.unwrap_or_else(|| DEFAULT_REMINDER.to_string()),
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("journie.db")
    }

    pub fn sweep_settings(&self) -> SweepSettings {
        SweepSettings {
            reminder_text: self.reminder_text.clone(),
            reminder_interval: self.reminder_interval,
            summarize_interval: self.summarize_interval,
            concurrency: self.sweep_concurrency,
        }
    }
}

fn secret<E: Fn(&str) -> Option<String>>(value: String, var: &str, env: &E) -> String {
    if value.is_empty() {
        env(var).unwrap_or_default()
    } else {
        value
    }
}

/// Smallest spacing between the next few occurrences of `schedule`, if it
/// fires at least twice more.
fn shortest_gap(schedule: &Schedule) -> Option<Duration> {
    let upcoming: Vec<_> = schedule.upcoming(Utc).take(25).collect();
    upcoming
        .windows(2)
        .filter_map(|pair| (pair[1] - pair[0]).to_std().ok())
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn load(file: &NamedTempFile) -> Result<Config, ConfigError> {
        Config::load_with_env(file.path(), no_env)
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_valid_config_with_defaults() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdefGHIjklMNOpqrsTUVwxyz",
            "gemini_api_key": "AIzaKey"
        }"#);
        let config = load(&file).expect("should load valid config");
        assert_eq!(config.gemini_model, "gemini-1.5-flash");
        assert_eq!(config.timezone, chrono_tz::Asia::Singapore);
        assert_eq!(config.sweep_hours, SweepHours { remind: 14, summarize: 20 });
        assert_eq!(config.reminder_interval, Duration::from_millis(100));
        assert_eq!(config.summarize_interval, Duration::from_millis(1000));
        assert_eq!(config.sweep_concurrency, 8);
        assert_eq!(config.history_limit, 30);
        assert_eq!(config.reminder_text, DEFAULT_REMINDER);
        assert_eq!(config.database_path(), PathBuf::from("./journie.db"));
    }

    #[test]
    fn test_overrides() {
        let file = write_config(r#"{
            "telegram_bot_token": "1:abc",
            "gemini_api_key": "k",
            "data_dir": "/var/lib/journie",
            "timezone": "Europe/Berlin",
            "remind_hour_utc": 18,
            "summarize_hour_utc": 2,
            "sweep_concurrency": 1,
            "reminder_text": "journal?"
        }"#);
        let config = load(&file).unwrap();
        assert_eq!(config.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(config.sweep_hours.remind, 18);
        assert_eq!(config.sweep_settings().concurrency, 1);
        assert_eq!(config.sweep_settings().reminder_text, "journal?");
        assert_eq!(config.database_path(), PathBuf::from("/var/lib/journie/journie.db"));
    }

    #[test]
    fn test_secrets_from_env() {
        let file = write_config("{}");
        let config = Config::load_with_env(file.path(), |name| match name {
            "TELEGRAM_TOKEN" => Some("42:secret".to_string()),
            "GEMINI_API_KEY" => Some("key".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.telegram_bot_token, "42:secret");
        assert_eq!(config.gemini_api_key, "key");
    }

    #[test]
    fn test_file_value_wins_over_env() {
        let file = write_config(r#"{"telegram_bot_token": "1:file", "gemini_api_key": "file"}"#);
        let config = Config::load_with_env(file.path(), |_| Some("2:env".to_string())).unwrap();
        assert_eq!(config.telegram_bot_token, "1:file");
        assert_eq!(config.gemini_api_key, "file");
    }

    #[test]
    fn test_empty_token() {
        let file = write_config(r#"{"gemini_api_key": "k"}"#);
        let err = assert_err(load(&file));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("telegram_bot_token"));
    }

    #[test]
    fn test_invalid_token_format() {
        for token in ["invalid_token_no_colon", "notanumber:ABCdef", "123456789:"] {
            let file = write_config(&format!(r#"{{"telegram_bot_token": "{token}", "gemini_api_key": "k"}}"#));
            let err = assert_err(load(&file));
            assert!(err.to_string().contains("invalid"), "{token}");
        }
    }

    #[test]
    fn test_missing_gemini_key() {
        let file = write_config(r#"{"telegram_bot_token": "1:abc"}"#);
        let err = assert_err(load(&file));
        assert!(err.to_string().contains("gemini_api_key"));
    }

    #[test]
    fn test_unknown_timezone() {
        let file = write_config(r#"{"telegram_bot_token": "1:abc", "gemini_api_key": "k", "timezone": "Mars/Olympus"}"#);
        let err = assert_err(load(&file));
        assert!(err.to_string().contains("Mars/Olympus"));
    }

    #[test]
    fn test_invalid_cron() {
        let file = write_config(r#"{"telegram_bot_token": "1:abc", "gemini_api_key": "k", "tick_cron": "every hour"}"#);
        let err = assert_err(load(&file));
        assert!(matches!(err, ConfigError::InvalidCron { .. }));
    }

    #[test]
    fn test_debounce_must_be_shorter_than_tick_interval() {
        // every second, default 2000ms debounce
        let file = write_config(r#"{"telegram_bot_token": "1:abc", "gemini_api_key": "k", "tick_cron": "* * * * * * *"}"#);
        let err = assert_err(load(&file));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("tick_debounce_ms"));

        let file = write_config(r#"{
            "telegram_bot_token": "1:abc",
            "gemini_api_key": "k",
            "tick_cron": "0 */5 * * * * *",
            "tick_debounce_ms": 300000
        }"#);
        assert!(assert_err(load(&file)).to_string().contains("tick_debounce_ms"));
    }

    #[test]
    fn test_debounce_below_tick_interval_accepted() {
        let file = write_config(r#"{"telegram_bot_token": "1:abc", "gemini_api_key": "k", "tick_cron": "0 */5 * * * * *"}"#);
        let config = load(&file).unwrap();
        assert_eq!(config.tick_debounce, Duration::from_millis(2000));
    }

    #[test]
    fn test_hours_out_of_range() {
        let file = write_config(r#"{"telegram_bot_token": "1:abc", "gemini_api_key": "k", "remind_hour_utc": 24}"#);
        let err = assert_err(load(&file));
        assert!(err.to_string().contains("remind_hour_utc"));
    }

    #[test]
    fn test_hours_must_differ() {
        let file = write_config(r#"{
            "telegram_bot_token": "1:abc",
            "gemini_api_key": "k",
            "remind_hour_utc": 20,
            "summarize_hour_utc": 20
        }"#);
        let err = assert_err(load(&file));
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn test_zero_concurrency() {
        let file = write_config(r#"{"telegram_bot_token": "1:abc", "gemini_api_key": "k", "sweep_concurrency": 0}"#);
        let err = assert_err(load(&file));
        assert!(err.to_string().contains("sweep_concurrency"));
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load_with_env("/nonexistent/path/config.json", no_env));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(load(&file));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}
