use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_AI_TIMEOUT_SECS: u64 = 20;
const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_DB_STATEMENT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_PORT: &str = "3000";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct AiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// Upper bound on a whole store call, acquire included.
    pub statement_timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub database: DatabaseSettings,
    pub ai: AiSettings,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let ai = AiSettings {
            api_key: non_blank("OPENAI_API_KEY"),
            model: non_blank("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(parse_positive(
                "AI_TIMEOUT_SECS",
                non_blank("AI_TIMEOUT_SECS"),
                DEFAULT_AI_TIMEOUT_SECS,
            )?),
        };

        let database = DatabaseSettings {
            max_connections: parse_positive(
                "DB_MAX_CONNECTIONS",
                non_blank("DB_MAX_CONNECTIONS"),
                DEFAULT_DB_MAX_CONNECTIONS,
            )?,
            acquire_timeout: Duration::from_secs(parse_positive(
                "DB_ACQUIRE_TIMEOUT_SECS",
                non_blank("DB_ACQUIRE_TIMEOUT_SECS"),
                DEFAULT_DB_ACQUIRE_TIMEOUT_SECS,
            )?),
            statement_timeout: Duration::from_secs(parse_positive(
                "DB_STATEMENT_TIMEOUT_SECS",
                non_blank("DB_STATEMENT_TIMEOUT_SECS"),
                DEFAULT_DB_STATEMENT_TIMEOUT_SECS,
            )?),
        };

        let bind_addr = non_blank("BIND_ADDR").unwrap_or_else(|| {
            let port = non_blank("PORT").unwrap_or_else(|| DEFAULT_PORT.to_string());
            format!("0.0.0.0:{}", port)
        });

        Ok(Self {
            database_url: non_blank("DATABASE_URL"),
            database,
            ai,
            bind_addr,
        })
    }
}

fn parse_positive<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<T>() {
        Ok(v) if v > T::default() => Ok(v),
        _ => Err(ConfigError::InvalidNumber { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert!(cfg.database_url.is_none());
        assert!(cfg.ai.api_key.is_none());
        assert_eq!(cfg.ai.model, DEFAULT_MODEL);
        assert_eq!(cfg.ai.timeout, Duration::from_secs(20));
        assert_eq!(cfg.database.max_connections, 10);
        assert_eq!(cfg.database.acquire_timeout, Duration::from_secs(5));
        assert_eq!(cfg.database.statement_timeout, Duration::from_secs(10));
        assert_eq!(cfg.bind_addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_overrides_and_blank_key() {
        let cfg = config(&[
            ("DATABASE_URL", "postgres://localhost/feedback"),
            ("OPENAI_API_KEY", "  "),
            ("OPENAI_MODEL", "gpt-4o-mini"),
            ("AI_TIMEOUT_SECS", "3"),
            ("DB_STATEMENT_TIMEOUT_SECS", "2"),
            ("PORT", "8080"),
        ])
        .unwrap();
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/feedback"));
        assert!(cfg.ai.api_key.is_none());
        assert_eq!(cfg.ai.model, "gpt-4o-mini");
        assert_eq!(cfg.ai.timeout, Duration::from_secs(3));
        assert_eq!(cfg.database.statement_timeout, Duration::from_secs(2));
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");

        let cfg = config(&[("BIND_ADDR", "127.0.0.1:9000"), ("PORT", "8080")]).unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        assert_eq!(
            config(&[("AI_TIMEOUT_SECS", "soon")]).unwrap_err(),
            ConfigError::InvalidNumber {
                key: "AI_TIMEOUT_SECS",
                value: "soon".to_string()
            }
        );
        assert!(config(&[("DB_MAX_CONNECTIONS", "0")]).is_err());
    }
}
