use std::{env, fmt, time::Duration};

use log::debug;

use crate::error::{PipelineError, Result};

const DEFAULT_ORIGINAL_TIMEZONE: &str = "UTC";
const DEFAULT_TARGET_TIMEZONE: &str = "Europe/Sofia";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for one pipeline run, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub original_timezone: String,
    pub target_timezone: String,
    pub request_timeout: Duration,
    pub database: DbSettings,
}

#[derive(Clone, Default)]
pub struct DbSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for DbSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Config> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file loaded: {}", e);
        }

        Config::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let port = match non_empty("DB_PORT") {
            Some(raw) => Some(raw.trim().parse::<u16>().map_err(|_| {
                PipelineError::Configuration(format!("DB_PORT is not a valid port: {}", raw))
            })?),
            None => None,
        };

        Ok(Config {
            api_url: lookup("API_URL").unwrap_or_default(),
            original_timezone: non_empty("ORIGINAL_TIMEZONE")
                .unwrap_or_else(|| DEFAULT_ORIGINAL_TIMEZONE.to_string()),
            target_timezone: non_empty("TARGET_TIMEZONE")
                .unwrap_or_else(|| DEFAULT_TARGET_TIMEZONE.to_string()),
            request_timeout: REQUEST_TIMEOUT,
            database: DbSettings {
                host: non_empty("DB_HOST"),
                port,
                name: non_empty("DB_NAME"),
                user: non_empty("DB_USER"),
                password: lookup("DB_PASS"),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_keys_are_missing() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.api_url, "");
        assert_eq!(config.original_timezone, "UTC");
        assert_eq!(config.target_timezone, "Europe/Sofia");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert!(config.database.host.is_none());
        assert!(config.database.port.is_none());
    }

    #[test]
    fn reads_every_key() {
        let config = config_from(&[
            ("API_URL", "https://rates.example/latest"),
            ("ORIGINAL_TIMEZONE", "America/New_York"),
            ("TARGET_TIMEZONE", "Asia/Tokyo"),
            ("DB_HOST", "db"),
            ("DB_PORT", "5433"),
            ("DB_NAME", "rates"),
            ("DB_USER", "etl"),
            ("DB_PASS", "secret"),
        ])
        .unwrap();

        assert_eq!(config.api_url, "https://rates.example/latest");
        assert_eq!(config.original_timezone, "America/New_York");
        assert_eq!(config.target_timezone, "Asia/Tokyo");
        assert_eq!(config.database.host.as_deref(), Some("db"));
        assert_eq!(config.database.port, Some(5433));
        assert_eq!(config.database.name.as_deref(), Some("rates"));
        assert_eq!(config.database.user.as_deref(), Some("etl"));
        assert_eq!(config.database.password.as_deref(), Some("secret"));
    }

    #[test]
    fn invalid_port_is_a_configuration_error() {
        let err = config_from(&[("DB_PORT", "postgres")]).unwrap_err();

        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn debug_output_hides_password() {
        let config = config_from(&[("DB_PASS", "hunter2")]).unwrap();

        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("***"));
    }
}
