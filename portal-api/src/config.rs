use std::env;

use anyhow::{anyhow, Context};
use dotenv::dotenv;
use points::DayPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    // Server configuration
    pub server_host: String,
    pub server_port: u16,

    // Database configuration
    pub database_url: String,
    pub database_max_connections: u32,

    // Security
    pub allowed_origins: Vec<String>,
    pub rate_limit: usize, // requests per minute per client

    // Points
    pub day_utc_offset_minutes: i32,
    pub enable_config_seed: bool,
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_host = var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let server_port = parse_or(var("SERVER_PORT"), "SERVER_PORT", 3001u16)?;

        let database_url = var("DATABASE_URL").ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;
        let database_max_connections = parse_or(
            var("DATABASE_MAX_CONNECTIONS"),
            "DATABASE_MAX_CONNECTIONS",
            10u32,
        )?;

        let allowed_origins = var("ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let rate_limit = parse_or(var("RATE_LIMIT"), "RATE_LIMIT", 120usize)?;

        let day_utc_offset_minutes = parse_or(
            var("POINTS_DAY_UTC_OFFSET_MINUTES"),
            "POINTS_DAY_UTC_OFFSET_MINUTES",
            0i32,
        )?;
        if DayPolicy::with_offset_minutes(day_utc_offset_minutes).is_none() {
            return Err(anyhow!(
                "POINTS_DAY_UTC_OFFSET_MINUTES must be within one day of UTC, got {}",
                day_utc_offset_minutes
            ));
        }

        let enable_config_seed = parse_or(var("ENABLE_CONFIG_SEED"), "ENABLE_CONFIG_SEED", false)?;

        Ok(Config {
            server_host,
            server_port,
            database_url,
            database_max_connections,
            allowed_origins,
            rate_limit,
            day_utc_offset_minutes,
            enable_config_seed,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn day_policy(&self) -> DayPolicy {
        DayPolicy::with_offset_minutes(self.day_utc_offset_minutes).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_is_set() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/portal")]).unwrap();
        assert_eq!(config.server_address(), "0.0.0.0:3001");
        assert_eq!(config.database_max_connections, 10);
        assert!(config.allowed_origins.is_empty());
        assert_eq!(config.rate_limit, 120);
        assert_eq!(config.day_policy(), DayPolicy::utc());
        assert!(!config.enable_config_seed);
    }

    #[test]
    fn database_url_is_required() {
        assert!(config_from(&[]).is_err());
    }

    #[test]
    fn parses_overrides() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://db/portal"),
            ("SERVER_PORT", "8080"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
            ("POINTS_DAY_UTC_OFFSET_MINUTES", "480"),
            ("ENABLE_CONFIG_SEED", "true"),
        ])
        .unwrap();
        assert_eq!(config.server_port, 8080);
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(
            config.day_policy(),
            DayPolicy::with_offset_minutes(480).unwrap()
        );
        assert!(config.enable_config_seed);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config_from(&[("DATABASE_URL", "x"), ("SERVER_PORT", "http")]).is_err());
        assert!(config_from(&[
            ("DATABASE_URL", "x"),
            ("POINTS_DAY_UTC_OFFSET_MINUTES", "1440")
        ])
        .is_err());
    }
}
