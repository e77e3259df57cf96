use std::env;
use std::fmt::Display;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{FixedOffset, NaiveDate};
use dotenvy::dotenv;
use strum_macros::{Display as StrumDisplay, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum StorageBackend {
    Json,
    Mysql,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub json_db_path: String,
    pub jwt_secret: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Work calendar
    pub work_offset: FixedOffset,
    pub holidays: Vec<NaiveDate>,

    pub seed_demo_users: bool,
    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source; `from_env` passes the process environment.
    pub fn from_lookup<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage: StorageBackend = parse_or(&var, "STORAGE_BACKEND", "json")?;
        let database_url = var("DATABASE_URL");
        if storage == StorageBackend::Mysql && database_url.is_none() {
            bail!("DATABASE_URL must be set when STORAGE_BACKEND=mysql");
        }

        let config = Self {
            server_addr: var("SERVER_ADDR").unwrap_or_else(|| "127.0.0.1:5000".to_string()),
            storage,
            database_url,
            json_db_path: var("JSON_DB_PATH").unwrap_or_else(|| "db.json".to_string()),
            jwt_secret: var("JWT_SECRET").context("JWT_SECRET must be set")?,
            access_token_ttl: parse_or(&var, "ACCESS_TOKEN_TTL", "604800")?, // 7 days
            refresh_token_ttl: parse_or(&var, "REFRESH_TOKEN_TTL", "2592000")?, // 30 days

            rate_login_per_min: parse_or(&var, "RATE_LOGIN_PER_MIN", "60")?,
            rate_register_per_min: parse_or(&var, "RATE_REGISTER_PER_MIN", "30")?,
            rate_refresh_per_min: parse_or(&var, "RATE_REFRESH_PER_MIN", "30")?,
            rate_protected_per_min: parse_or(&var, "RATE_PROTECTED_PER_MIN", "1000")?,

            api_prefix: var("API_PREFIX").unwrap_or_else(|| "/api".to_string()),

            work_offset: parse_offset(&var("WORK_UTC_OFFSET").unwrap_or_else(|| "+00:00".to_string()))?,
            holidays: parse_holidays(&var("HOLIDAYS").unwrap_or_default())?,

            seed_demo_users: parse_or(&var, "SEED_DEMO_USERS", "true")?,
            log_dir: var("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
        };

        if config.jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }
        for (key, value) in [
            ("RATE_LOGIN_PER_MIN", config.rate_login_per_min),
            ("RATE_REGISTER_PER_MIN", config.rate_register_per_min),
            ("RATE_REFRESH_PER_MIN", config.rate_refresh_per_min),
            ("RATE_PROTECTED_PER_MIN", config.rate_protected_per_min),
        ] {
            if value == 0 {
                bail!("{key} must be greater than zero");
            }
        }

        Ok(config)
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = var(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("invalid {key} value {raw:?}: {e}"))
}

/// `+HH:MM` / `-HH:MM`; `Z` means UTC.
fn parse_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).context("zero offset");
    }

    let (sign, rest) = match raw.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => bail!("invalid WORK_UTC_OFFSET {raw:?}: expected +HH:MM or -HH:MM"),
    };
    let (hours, minutes) = rest
        .split_once(':')
        .with_context(|| format!("invalid WORK_UTC_OFFSET {raw:?}: expected +HH:MM or -HH:MM"))?;
    let hours: i32 = hours
        .parse()
        .with_context(|| format!("invalid WORK_UTC_OFFSET hours in {raw:?}"))?;
    let minutes: i32 = minutes
        .parse()
        .with_context(|| format!("invalid WORK_UTC_OFFSET minutes in {raw:?}"))?;
    if !(0..60).contains(&minutes) {
        bail!("invalid WORK_UTC_OFFSET minutes in {raw:?}");
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .with_context(|| format!("WORK_UTC_OFFSET {raw:?} is out of range"))
}

fn parse_holidays(raw: &str) -> Result<Vec<NaiveDate>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("invalid HOLIDAYS entry {s:?}, expected YYYY-MM-DD"))
        })
        .collect()
}
