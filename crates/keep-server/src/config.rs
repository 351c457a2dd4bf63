use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "osckeep_secret_key_change_me",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// Push over the notifications WebSocket
    Push,
    /// Log only
    Log,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub reminder_interval: Duration,
    pub delivery_timeout: Duration,
    pub sink: SinkKind,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = var("KEEP_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("KEEP_JWT_SECRET is unset or still a placeholder");
        }

        let port: u16 = var("KEEP_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("KEEP_PORT")?;

        let reminder_interval_secs: u64 = var("KEEP_REMINDER_INTERVAL_SECS")
            .unwrap_or_else(|| "60".into())
            .parse()
            .context("KEEP_REMINDER_INTERVAL_SECS")?;
        if reminder_interval_secs == 0 {
            bail!("KEEP_REMINDER_INTERVAL_SECS must be positive");
        }

        let delivery_timeout_secs: u64 = var("KEEP_DELIVERY_TIMEOUT_SECS")
            .unwrap_or_else(|| "10".into())
            .parse()
            .context("KEEP_DELIVERY_TIMEOUT_SECS")?;
        if delivery_timeout_secs == 0 {
            bail!("KEEP_DELIVERY_TIMEOUT_SECS must be positive");
        }

        let sink = match var("KEEP_NOTIFY_SINK").as_deref() {
            None | Some("push") => SinkKind::Push,
            Some("log") => SinkKind::Log,
            Some(other) => bail!("KEEP_NOTIFY_SINK must be 'push' or 'log', got '{}'", other),
        };

        Ok(Self {
            host: var("KEEP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("KEEP_DB_PATH").unwrap_or_else(|| "keep.db".into()).into(),
            jwt_secret,
            reminder_interval: Duration::from_secs(reminder_interval_secs),
            delivery_timeout: Duration::from_secs(delivery_timeout_secs),
            sink,
            admin_password: var("KEEP_ADMIN_PASSWORD").filter(|p| !p.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&[("KEEP_JWT_SECRET", "s3cr3t")])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.reminder_interval, Duration::from_secs(60));
        assert_eq!(config.delivery_timeout, Duration::from_secs(10));
        assert_eq!(config.sink, SinkKind::Push);
        assert_eq!(config.db_path, PathBuf::from("keep.db"));
        assert!(config.admin_password.is_none());
    }

    #[test]
    fn placeholder_secret_is_refused() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("KEEP_JWT_SECRET", "dev-secret-change-me")])).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("KEEP_JWT_SECRET", "s3cr3t"),
            ("KEEP_PORT", "8080"),
            ("KEEP_REMINDER_INTERVAL_SECS", "5"),
            ("KEEP_NOTIFY_SINK", "log"),
            ("KEEP_ADMIN_PASSWORD", "admin123"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.reminder_interval, Duration::from_secs(5));
        assert_eq!(config.sink, SinkKind::Log);
        assert_eq!(config.admin_password.as_deref(), Some("admin123"));

        assert!(Config::from_lookup(lookup(&[("KEEP_JWT_SECRET", "s"), ("KEEP_NOTIFY_SINK", "sms")])).is_err());
        assert!(Config::from_lookup(lookup(&[("KEEP_JWT_SECRET", "s"), ("KEEP_REMINDER_INTERVAL_SECS", "0")])).is_err());
    }

    #[test]
    fn zero_delivery_timeout_is_refused() {
        let err = Config::from_lookup(lookup(&[
            ("KEEP_JWT_SECRET", "s3cr3t"),
            ("KEEP_DELIVERY_TIMEOUT_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("KEEP_DELIVERY_TIMEOUT_SECS"));
    }
}
