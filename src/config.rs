use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "cenit.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Usually left out of the file and supplied through `DATABASE_URL`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProgressConfig {
    /// Days of history shown in the report's trend section.
    #[serde(default = "default_trend_days")]
    pub trend_days: i64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            trend_days: default_trend_days(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_filter() -> String {
    "info,sqlx=warn".to_string()
}

fn default_trend_days() -> i64 {
    7
}

impl AppConfig {
    /// Reads the config file when present and applies environment overrides.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Self::parse(&content).with_context(|| format!("invalid {}", path.display()))?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = Some(url);
        }
        if let Ok(value) = std::env::var("CENIT_MAX_CONNECTIONS") {
            config.database.max_connections = value
                .parse()
                .context("CENIT_MAX_CONNECTIONS must be a positive integer")?;
        }

        config.check()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        config.check()?;
        Ok(config)
    }

    /// Bounds that must hold after the file and the environment are merged.
    pub fn check(&self) -> anyhow::Result<()> {
        if self.database.max_connections == 0 {
            anyhow::bail!("database.max_connections must be at least 1");
        }
        if self.progress.trend_days < 1 {
            anyhow::bail!("progress.trend_days must be at least 1");
        }
        Ok(())
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database
            .url
            .as_deref()
            .context("DATABASE_URL must be set to the hosted Postgres instance")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.logging.filter, "info,sqlx=warn");
        assert_eq!(config.progress.trend_days, 7);
        assert!(config.database_url().is_err());
    }

    #[test]
    fn reads_sections() {
        let config = AppConfig::parse(
            r#"
            [database]
            url = "postgres://localhost/cenit"
            max_connections = 2

            [logging]
            filter = "debug"

            [progress]
            trend_days = 14
            "#,
        )
        .unwrap();
        assert_eq!(config.database_url().unwrap(), "postgres://localhost/cenit");
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.progress.trend_days, 14);
    }

    #[test]
    fn rejects_zero_connections() {
        assert!(AppConfig::parse("[database]\nmax_connections = 0").is_err());

        let mut overridden = AppConfig::parse("").unwrap();
        overridden.database.max_connections = 0;
        let err = overridden.check().unwrap_err();
        assert!(err.to_string().contains("max_connections"));
    }
}
