use std::{str::FromStr, time::Duration};

use actix_web::http::Uri;
use anyhow::{anyhow, Context, Result};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8081;
const DEFAULT_EXPENSE_SERVICE_URL: &str = "http://expense-service:8080/expenses";
const DEFAULT_TIMEOUT_MS: u64 = 5000;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub expense_service: ExpenseServiceConfig,
    pub cors_allowed_origins: AllowedOrigins,
}

#[derive(Debug, Clone)]
pub struct ExpenseServiceConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl Config {
    pub fn init() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;

        let timeout_ms = parse_or(&lookup, "EXPENSE_SERVICE_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?;
        if timeout_ms == 0 {
            return Err(anyhow!("EXPENSE_SERVICE_TIMEOUT_MS must be greater than zero"));
        }

        let expense_service = ExpenseServiceConfig {
            base_url: lookup("EXPENSE_SERVICE_URL")
                .unwrap_or_else(|| DEFAULT_EXPENSE_SERVICE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout: Duration::from_millis(timeout_ms),
            max_retries: parse_or(&lookup, "EXPENSE_SERVICE_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            retry_backoff: Duration::from_millis(parse_or(
                &lookup,
                "EXPENSE_SERVICE_RETRY_BACKOFF_MS",
                DEFAULT_RETRY_BACKOFF_MS,
            )?),
        };
        if expense_service.base_url.is_empty() {
            return Err(anyhow!("EXPENSE_SERVICE_URL must not be empty"));
        }

        let cors_allowed_origins = match lookup("CORS_ALLOWED_ORIGINS") {
            Some(raw) => AllowedOrigins::parse(&raw)?,
            None => AllowedOrigins::Any,
        };

        Ok(Self {
            host,
            port,
            expense_service,
            cors_allowed_origins,
        })
    }
}

impl AllowedOrigins {
    fn parse(raw: &str) -> Result<Self> {
        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();
        if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
            return Ok(AllowedOrigins::Any);
        }
        for origin in &origins {
            let valid = origin
                .parse::<Uri>()
                .map(|uri| uri.scheme().is_some() && uri.authority().is_some())
                .unwrap_or(false);
            if !valid {
                return Err(anyhow!(
                    "CORS_ALLOWED_ORIGINS must be '*' or comma-separated origins \
                     like 'https://host:port', got '{origin}'"
                ));
            }
        }
        Ok(AllowedOrigins::List(origins))
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid {}", std::any::type_name::<T>())),
        None => Ok(default),
    }
}
