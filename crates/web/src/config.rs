use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Absent means contests are kept in process memory.
    pub database_url: Option<String>,
    pub admin_jwt_secret: String,
    pub auth_public_key_pem: String,
    pub auth_issuer: Option<String>,
    pub auth_audience: Option<String>,
    pub status_refresh_interval: Option<Duration>,
    pub cors_allow_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: std::env::var("HOST").context("Cannot load HOST env variable")?,
            port: std::env::var("PORT")
                .context("Cannot load PORT env variable")?
                .parse()
                .context("PORT must be a number")?,
            database_url: optional_var("DATABASE_URL"),
            admin_jwt_secret: std::env::var("ADMIN_JWT_SECRET")
                .context("Cannot load ADMIN_JWT_SECRET env variable")?,
            auth_public_key_pem: std::env::var("AUTH_PUBLIC_KEY_PEM")
                .context("Cannot load AUTH_PUBLIC_KEY_PEM env variable")?,
            auth_issuer: optional_var("AUTH_ISSUER"),
            auth_audience: optional_var("AUTH_AUDIENCE"),
            status_refresh_interval: refresh_interval(optional_var(
                "STATUS_REFRESH_INTERVAL_SECS",
            ))?,
            cors_allow_origin: optional_var("CORS_ALLOW_ORIGIN"),
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `None` disables the in-process refresher.
fn refresh_interval(raw: Option<String>) -> Result<Option<Duration>> {
    let secs = match raw {
        Some(raw) => raw
            .parse::<u64>()
            .context("STATUS_REFRESH_INTERVAL_SECS must be a number")?,
        None => DEFAULT_REFRESH_INTERVAL_SECS,
    };

    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_interval_defaults_and_disables() {
        assert_eq!(
            refresh_interval(None).unwrap(),
            Some(Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS))
        );
        assert_eq!(refresh_interval(Some("0".into())).unwrap(), None);
        assert_eq!(
            refresh_interval(Some("15".into())).unwrap(),
            Some(Duration::from_secs(15))
        );
        assert!(refresh_interval(Some("soon".into())).is_err());
    }
}
