use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "KDRILL_CONFIG";
pub const LOG_FILTER_ENV: &str = "KDRILL_LOG";

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// kubeconfig context to use instead of the current one
    pub context: Option<String>,
    pub log_filter: Option<String>,
    pub log_file: Option<PathBuf>,
    pub logs: LogOptions,
    #[serde(skip)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct LogOptions {
    #[serde(alias = "tail")]
    pub tail_lines: Option<i64>,
    pub timestamps: bool,
    pub previous: bool,
}

impl RuntimeConfig {
    pub fn load() -> Result<Self> {
        match discover_config_path() {
            Some(path) => Self::from_path(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config {}", path.display()))?;
        let mut config = Self::parse(&raw)
            .with_context(|| format!("failed to parse runtime config {}", path.display()))?;
        config.source = Some(path.display().to_string());
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config = serde_yaml::from_str(raw)?;
        Ok(config)
    }

    /// `KDRILL_LOG` wins over the file, `info` is the fallback.
    pub fn effective_log_filter(&self) -> String {
        resolve_log_filter(
            std::env::var(LOG_FILTER_ENV).ok().as_deref(),
            self.log_filter.as_deref(),
        )
    }
}

fn resolve_log_filter(env_filter: Option<&str>, file_filter: Option<&str>) -> String {
    [env_filter, file_filter]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or("info")
        .to_string()
}

fn discover_config_path() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok().map(PathBuf::from);
    config_path_in(
        std::env::var(CONFIG_ENV).ok().as_deref(),
        Path::new(""),
        home.as_deref(),
    )
}

fn config_path_in(explicit: Option<&str>, cwd: &Path, home: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        cwd.join("kdrill.yaml"),
        cwd.join("kdrill.yml"),
        cwd.join(".kdrill.yaml"),
    ];
    if let Some(found) = cwd_candidates.into_iter().find(|candidate| candidate.exists()) {
        return Some(found);
    }

    let home = home?;
    [
        home.join(".config/kdrill/config.yaml"),
        home.join(".config/kdrill/config.yml"),
        home.join(".kdrill.yaml"),
    ]
    .into_iter()
    .find(|candidate| candidate.exists())
}
