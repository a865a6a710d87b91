use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub general: General,
    pub server: Server,
    pub clickhouse: ClickHouse,
    #[serde(default)]
    pub inspection: Inspection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct General {
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClickHouse {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl ClickHouse {
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Store-inspection endpoints. Off unless configured.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct Inspection {
    pub enabled: bool,
    /// Allows `/query?sql=` and `where=` on table data. Arbitrary SQL, so keep
    /// this off anywhere the dashboard is reachable by untrusted users.
    pub allow_raw_sql: bool,
}

impl Config {
    /// Read `path`, apply `CLICKHOUSE_*` / `PORT` environment overrides, validate.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {path}"))?;
        let mut config: Config = toml::from_str(&content).context("failed to parse config")?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).context("failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Override settings from `lookup` (the process environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(host) = lookup("CLICKHOUSE_HOST") {
            self.clickhouse.host = host;
        }
        if let Some(port) = lookup("CLICKHOUSE_PORT") {
            self.clickhouse.port = port
                .parse()
                .with_context(|| format!("CLICKHOUSE_PORT is not a port: {port}"))?;
        }
        if let Some(database) = lookup("CLICKHOUSE_DATABASE") {
            self.clickhouse.database = database;
        }
        if let Some(username) = lookup("CLICKHOUSE_USERNAME") {
            self.clickhouse.username = username;
        }
        if let Some(password) = lookup("CLICKHOUSE_PASSWORD") {
            self.clickhouse.password = password;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("PORT is not a port: {port}"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.server.port > 0, "server.port must be > 0");
        anyhow::ensure!(
            !self.clickhouse.host.is_empty(),
            "clickhouse.host must not be empty"
        );
        anyhow::ensure!(self.clickhouse.port > 0, "clickhouse.port must be > 0");
        anyhow::ensure!(
            !self.clickhouse.database.is_empty(),
            "clickhouse.database must not be empty"
        );
        anyhow::ensure!(
            self.clickhouse.timeout_secs > 0,
            "clickhouse.timeout_secs must be > 0"
        );
        Ok(())
    }

    pub fn default_config_path() -> String {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf));

        if let Some(dir) = &exe_dir {
            let candidate = dir.join("dashboard.toml");
            if candidate.exists() {
                return candidate.to_string_lossy().to_string();
            }
        }

        "config/default.toml".to_string()
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_toml_str(s)
    }
}
