use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppMode {
    Api,
    Worker,
    Reconcile,
}

impl FromStr for AppMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "api" => Ok(Self::Api),
            "worker" => Ok(Self::Worker),
            "reconcile" => Ok(Self::Reconcile),
            other => Err(anyhow!("unknown APP_MODE: {}", other)),
        }
    }
}

/// S3-compatible media bucket. Absent when none of the `S3_*` variables are set.
#[derive(Clone, Debug)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub public_endpoint: Option<String>,
}

#[derive(Clone, Debug)]
pub struct QueueConfig {
    pub endpoint: String,
    pub name: String,
    pub region: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub app_mode: AppMode,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub db_statement_timeout_ms: u64,
    pub s3: Option<S3Config>,
    pub queue: Option<QueueConfig>,
    pub paseto_access_key: [u8; 32],
    pub admin_token: Option<String>,
    pub upload_max_bytes: usize,
    pub request_timeout_seconds: u64,
    pub story_ttl_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;
        let app_mode: AppMode = env_or("APP_MODE", "api").parse()?;

        let queue = queue_from_env()?;
        if app_mode == AppMode::Worker && queue.is_none() {
            return Err(anyhow!("worker mode requires QUEUE_ENDPOINT and QUEUE_NAME"));
        }

        let story_ttl_hours: i64 = env_or_parse("STORY_TTL_HOURS", "24")?;
        if story_ttl_hours <= 0 {
            return Err(anyhow!("invalid STORY_TTL_HOURS: must be positive"));
        }

        Ok(Self {
            http_addr,
            app_mode,
            database_url: env_opt("DATABASE_URL"),
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "25")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env_or_parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            db_statement_timeout_ms: env_or_parse("DB_STATEMENT_TIMEOUT_MS", "5000")?,
            s3: s3_from_env()?,
            queue,
            paseto_access_key: env_key_32("PASETO_ACCESS_KEY")?,
            admin_token: env_opt("ADMIN_TOKEN"),
            upload_max_bytes: env_or_parse("UPLOAD_MAX_BYTES", "10485760")?,
            request_timeout_seconds: env_or_parse("REQUEST_TIMEOUT_SECONDS", "10")?,
            story_ttl_hours,
        })
    }
}

fn s3_from_env() -> Result<Option<S3Config>> {
    let endpoint = env_opt("S3_ENDPOINT");
    let bucket = env_opt("S3_BUCKET");
    match (endpoint, bucket) {
        (None, None) => Ok(None),
        (Some(endpoint), Some(bucket)) => Ok(Some(S3Config {
            endpoint,
            bucket,
            region: env_or("S3_REGION", "fr-par"),
            public_endpoint: env_opt("S3_PUBLIC_ENDPOINT"),
        })),
        _ => Err(anyhow!("S3_ENDPOINT and S3_BUCKET must be set together")),
    }
}

fn queue_from_env() -> Result<Option<QueueConfig>> {
    let endpoint = env_opt("QUEUE_ENDPOINT");
    let name = env_opt("QUEUE_NAME");
    match (endpoint, name) {
        (None, None) => Ok(None),
        (Some(endpoint), Some(name)) => {
            let region = env_opt("QUEUE_REGION").unwrap_or_else(|| env_or("S3_REGION", "fr-par"));
            Ok(Some(QueueConfig {
                endpoint,
                name,
                region,
            }))
        }
        _ => Err(anyhow!("QUEUE_ENDPOINT and QUEUE_NAME must be set together")),
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn env_key_32(key: &str) -> Result<[u8; 32]> {
    let value = env_or_err(key)?;
    decode_key_32(&value).map_err(|err| anyhow!("invalid {}: {}", key, err))
}

pub fn decode_key_32(value: &str) -> Result<[u8; 32]> {
    let decoded = STANDARD.decode(value.trim().as_bytes())?;
    if decoded.len() != 32 {
        return Err(anyhow!("expected 32 bytes, got {}", decoded.len()));
    }
    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&decoded);
    Ok(key_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_mode_parses_known_values() {
        assert_eq!("api".parse::<AppMode>().unwrap(), AppMode::Api);
        assert_eq!("worker".parse::<AppMode>().unwrap(), AppMode::Worker);
        assert_eq!("reconcile".parse::<AppMode>().unwrap(), AppMode::Reconcile);
        assert!("batch".parse::<AppMode>().is_err());
    }

    #[test]
    fn key_must_decode_to_32_bytes() {
        let good = STANDARD.encode([7u8; 32]);
        assert_eq!(decode_key_32(&good).unwrap(), [7u8; 32]);

        let short = STANDARD.encode([7u8; 16]);
        assert!(decode_key_32(&short).is_err());
        assert!(decode_key_32("not base64!").is_err());
    }
}
