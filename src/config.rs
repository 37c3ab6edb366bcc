//! Module reading the runtime configuration once at startup

use std::str::FromStr;
use std::time::Duration;

use crate::Error;
use crate::error::config_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format {other:?}, expected pretty or json")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Size of the buffer the upload is read through
    pub buffer_size: usize,
    /// Threads publishing chunks, also the capacity of the dispatch channel
    pub upload_workers: usize,
    /// Threads processing chunk messages
    pub processors: usize,
    pub inbox_capacity: usize,
    /// How long a single consume call waits for a message
    pub poll_interval: Duration,
    /// Deliveries of an unacknowledged message before the in-memory bus dead-letters it
    pub max_deliveries: u32,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer_size: 64 * 1024,
            upload_workers: 4,
            processors: 4,
            inbox_capacity: 4,
            poll_interval: Duration::from_millis(100),
            max_deliveries: 5,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let defaults = Self::default();
        let processors = positive(&lookup, "PROCESSORS", defaults.processors)?;

        Ok(Self {
            buffer_size: positive(&lookup, "BUFFER_SIZE", defaults.buffer_size)?,
            upload_workers: positive(&lookup, "UPLOAD_WORKERS", defaults.upload_workers)?,
            processors,
            inbox_capacity: positive(&lookup, "INBOX_CAPACITY", processors)?,
            poll_interval: Duration::from_millis(positive(
                &lookup,
                "POLL_INTERVAL_MS",
                defaults.poll_interval.as_millis() as u64,
            )?),
            max_deliveries: positive(&lookup, "MAX_DELIVERIES", defaults.max_deliveries)?,
            log_format: parsed(&lookup, "LOG_FORMAT", defaults.log_format)?,
        })
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, variable: &str, default: T) -> Result<T, Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(variable) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| config_error(variable, e.to_string())),
        None => Ok(default),
    }
}

fn positive<T>(lookup: &impl Fn(&str) -> Option<String>, variable: &str, default: T) -> Result<T, Error>
where
    T: FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let value = parsed(lookup, variable, default)?;
    if value <= T::default() {
        return Err(config_error(variable, "must be greater than zero"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use claims::{assert_err, assert_matches, assert_ok};

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn unset_variables_keep_defaults() {
        let config = assert_ok!(Config::from_lookup(lookup(&[])));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn inbox_capacity_follows_processors() {
        let config = assert_ok!(Config::from_lookup(lookup(&[("PROCESSORS", "12")])));
        assert_eq!(config.processors, 12);
        assert_eq!(config.inbox_capacity, 12);
    }

    #[test]
    fn every_variable_is_read() {
        let config = assert_ok!(Config::from_lookup(lookup(&[
            ("BUFFER_SIZE", "16"),
            ("UPLOAD_WORKERS", "2"),
            ("PROCESSORS", "3"),
            ("INBOX_CAPACITY", "9"),
            ("POLL_INTERVAL_MS", "250"),
            ("MAX_DELIVERIES", "1"),
            ("LOG_FORMAT", "json"),
        ])));

        assert_eq!(
            config,
            Config {
                buffer_size: 16,
                upload_workers: 2,
                processors: 3,
                inbox_capacity: 9,
                poll_interval: Duration::from_millis(250),
                max_deliveries: 1,
                log_format: LogFormat::Json,
            }
        );
    }

    #[test]
    fn zero_is_rejected_with_the_variable_name() {
        let err = assert_err!(Config::from_lookup(lookup(&[("UPLOAD_WORKERS", "0")])));
        assert_matches!(err, Error::Config { variable, .. } if variable == "UPLOAD_WORKERS");
    }

    #[test]
    fn garbage_is_rejected() {
        assert_err!(Config::from_lookup(lookup(&[("BUFFER_SIZE", "lots")])));
        assert_err!(Config::from_lookup(lookup(&[("LOG_FORMAT", "xml")])));
    }
}
