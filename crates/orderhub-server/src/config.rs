use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, bail};

use orderhub_api::notify::SmtpSettings;

/// Sample-env JWT secrets that are refused at startup.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me", "secret"];

pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub reset_token_ttl_hours: u32,
    pub import_timeout_secs: u64,
    pub smtp: Option<SmtpSettings>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = std::env::var("ORDERHUB_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("ORDERHUB_JWT_SECRET is unset or still a placeholder");
        }

        Ok(Self {
            jwt_secret,
            db_path: var_or("ORDERHUB_DB_PATH", "orderhub.db").into(),
            host: var_or("ORDERHUB_HOST", "0.0.0.0"),
            port: parse_var("ORDERHUB_PORT", 8000)?,
            reset_token_ttl_hours: parse_var("ORDERHUB_RESET_TOKEN_TTL_HOURS", 24)?,
            import_timeout_secs: parse_var("ORDERHUB_IMPORT_TIMEOUT_SECS", 30)?,
            smtp: smtp_from_env()?,
        })
    }
}

/// SMTP is optional; without a host, emails are only logged.
fn smtp_from_env() -> anyhow::Result<Option<SmtpSettings>> {
    let Ok(host) = std::env::var("ORDERHUB_SMTP_HOST") else {
        return Ok(None);
    };

    Ok(Some(SmtpSettings {
        host,
        port: parse_var("ORDERHUB_SMTP_PORT", 587)?,
        username: std::env::var("ORDERHUB_SMTP_USERNAME").ok(),
        password: std::env::var("ORDERHUB_SMTP_PASSWORD").ok(),
        from: std::env::var("ORDERHUB_SMTP_FROM").context("ORDERHUB_SMTP_FROM is required with ORDERHUB_SMTP_HOST")?,
    }))
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}
