use anyhow::{Context, Result, anyhow};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/viewtube-social-env";
pub const DEFAULT_SOCIAL_PORT: u16 = 8080;
pub const DEFAULT_SOCIAL_HOST: &str = "127.0.0.1";
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Values read from the env-style config file. Every field is optional here;
/// [`resolve_runtime_settings`] decides what is required.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub database_path: Option<PathBuf>,
    pub social_port: Option<u16>,
    pub social_host: Option<String>,
    pub log_filter: Option<String>,
}

/// Command-line values that win over the config file.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOverrides {
    pub database_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub database_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_filter: String,
}

pub fn read_env_config(path: &Path) -> Result<Option<EnvConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let mut cfg = EnvConfig::default();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value_raw)) = trimmed.split_once('=') else {
            continue;
        };
        let value = value_raw.trim().trim_matches('"');
        if value.is_empty() {
            continue;
        }
        match key.trim() {
            "DATABASE_PATH" => cfg.database_path = Some(PathBuf::from(value)),
            "SOCIAL_PORT" => {
                let port: u16 = value
                    .parse()
                    .with_context(|| format!("Parsing SOCIAL_PORT from {}", path.display()))?;
                cfg.social_port = Some(port);
            }
            "SOCIAL_HOST" => cfg.social_host = Some(value.to_string()),
            "LOG_FILTER" => cfg.log_filter = Some(value.to_string()),
            _ => {}
        }
    }
    Ok(Some(cfg))
}

/// Merges the config file at `path` (if any) with `overrides`. The database
/// path must come from one of the two.
pub fn resolve_runtime_settings(
    path: impl AsRef<Path>,
    overrides: RuntimeOverrides,
) -> Result<RuntimeSettings> {
    let path = path.as_ref();
    let cfg = read_env_config(path)?.unwrap_or_default();
    let database_path = overrides
        .database_path
        .or(cfg.database_path)
        .ok_or_else(|| {
            anyhow!(
                "DATABASE_PATH not set in {} and no --db-path given",
                path.display()
            )
        })?;
    Ok(RuntimeSettings {
        database_path,
        host: overrides
            .host
            .or(cfg.social_host)
            .unwrap_or_else(|| DEFAULT_SOCIAL_HOST.to_string()),
        port: overrides
            .port
            .or(cfg.social_port)
            .unwrap_or(DEFAULT_SOCIAL_PORT),
        log_filter: cfg
            .log_filter
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
    })
}
