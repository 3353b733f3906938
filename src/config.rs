use chrono_tz::Tz;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_WSF_API_URL: &str = "https://www.wsdot.wa.gov/ferries/api/vessels/rest";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub wsf_api_url: String,
    pub wsf_api_access_code: String,
    pub tick_interval: Duration,
    pub retry_max_elapsed: Duration,
    pub fleet_timezone: Tz,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = required(&env_map, "DATABASE_PATH")?;
        let wsf_api_access_code = required(&env_map, "WSF_API_ACCESS_CODE")?;

        let wsf_api_url = env_map
            .get("WSF_API_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_WSF_API_URL.to_string());

        let tick_interval = positive_millis(&env_map, "TICK_INTERVAL_MS", 5_000)?;
        let retry_max_elapsed = positive_millis(&env_map, "FETCH_MAX_ELAPSED_MS", 30_000)?;

        let fleet_timezone = env_map
            .get("FLEET_TIMEZONE")
            .map(|s| s.as_str())
            .unwrap_or("America/Los_Angeles")
            .parse::<Tz>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "FLEET_TIMEZONE".to_string(),
                    "must be an IANA time zone name".to_string(),
                )
            })?;

        Ok(Config {
            port,
            database_path,
            wsf_api_url,
            wsf_api_access_code,
            tick_interval,
            retry_max_elapsed,
            fleet_timezone,
        })
    }
}

fn required(env_map: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    env_map
        .get(name)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnv(name.to_string()))
}

fn positive_millis(
    env_map: &HashMap<String, String>,
    name: &str,
    default_ms: u64,
) -> Result<Duration, ConfigError> {
    let ms = match env_map.get(name) {
        Some(raw) => raw.parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(name.to_string(), "must be a valid u64".to_string())
        })?,
        None => default_ms,
    };
    if ms == 0 {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_millis(ms))
}
