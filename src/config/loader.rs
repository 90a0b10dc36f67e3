// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{
    DEFAULT_HOST, DEFAULT_LOGS_DIR, DEFAULT_PORT, DEFAULT_TRACE_MAX_DEPTH, DEFAULT_UNITS_DIR,
    ENV_LOGS_DIR, ENV_PORT,
};
use crate::errors::ConfigError;
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level switchboard configuration.
///
/// Relative `units_dir` and `logs_dir` paths are resolved against the
/// directory containing the config file.
///
/// # Example
/// ```yaml
/// app_id: blog_tools
/// units_dir: units
/// logs_dir: logs
/// models:
///   default: fast
///   registry:
///     fast:
///       model: echo/fast
///       max_tokens: 512
///     careful:
///       model: echo/careful
///       temperature: 0.2
/// program_models:
///   HeadlineGenerator: careful
/// server:
///   port: 8000
///   sync_worker_threads: 8
/// tracing:
///   max_depth: 100
/// scheduler:
///   enabled: true
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app_id: String,
    #[serde(default = "default_units_dir")]
    pub units_dir: PathBuf,
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
    #[serde(default)]
    pub models: ModelsConfig,
    /// Unit name to model alias.
    #[serde(default)]
    pub program_models: IndexMap<String, String>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tracing: TracingConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelsConfig {
    /// Alias used by units without a `program_models` entry.
    pub default: Option<String>,
    #[serde(default)]
    pub registry: IndexMap<String, ModelConfig>,
}

/// One entry of the model registry.
///
/// The `model` identifier is `provider/name`; the provider prefix selects
/// which registered [`LanguageModel`](crate::traits::LanguageModel)
/// implementation serves the alias.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelConfig {
    pub model: String,
    #[serde(default = "default_model_type")]
    pub model_type: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub api_base: Option<String>,
}

impl ModelConfig {
    pub fn provider(&self) -> &str {
        self.model
            .split_once('/')
            .map(|(provider, _)| provider)
            .unwrap_or(&self.model)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Worker pool size for sync entry points; CPU count when unset.
    pub sync_worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            sync_worker_threads: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TracingConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_units_dir() -> PathBuf {
    PathBuf::from(DEFAULT_UNITS_DIR)
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from(DEFAULT_LOGS_DIR)
}

fn default_model_type() -> String {
    "chat".to_string()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_max_depth() -> usize {
    DEFAULT_TRACE_MAX_DEPTH
}

fn default_enabled() -> bool {
    true
}

impl Config {
    /// Apply `SWITCHBOARD_LOGS_DIR` and `SWITCHBOARD_PORT` from `lookup`.
    ///
    /// An unparseable port is ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_LOGS_DIR).filter(|d| !d.is_empty()) {
            self.logs_dir = PathBuf::from(dir);
        }
        if let Some(port) = lookup(ENV_PORT) {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring {}={}: not a valid port", ENV_PORT, port),
            }
        }
    }

    fn resolve_paths(&mut self, base: &Path) {
        if self.units_dir.is_relative() {
            self.units_dir = base.join(&self.units_dir);
        }
        if self.logs_dir.is_relative() {
            self.logs_dir = base.join(&self.logs_dir);
        }
    }
}

/// Load a config from a YAML file, applying environment overrides.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut cfg: Config = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    cfg.apply_overrides(|key| std::env::var(key).ok());
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    cfg.resolve_paths(base);
    Ok(cfg)
}

/// Load and validate a config from a YAML file
///
/// Every validation failure is reported, not just the first.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let cfg = load_config(path)?;
    crate::config::validate_config(&cfg).map_err(ConfigError::Invalid)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ValidationError;
    use std::collections::HashMap;
    use tempfile::TempDir;

    const FULL: &str = r#"
app_id: blog_tools
models:
  default: fast
  registry:
    fast:
      model: echo/fast
      max_tokens: 512
    careful:
      model: openai/gpt-4o
      temperature: 0.2
      api_base: http://localhost:4000
program_models:
  HeadlineGenerator: careful
server:
  port: 9000
  sync_worker_threads: 4
tracing:
  max_depth: 12
scheduler:
  enabled: false
"#;

    #[test]
    fn parse_full_config() {
        let cfg: Config = serde_yaml::from_str(FULL).unwrap();
        assert_eq!(cfg.app_id, "blog_tools");
        assert_eq!(cfg.models.default.as_deref(), Some("fast"));
        assert_eq!(cfg.models.registry["fast"].provider(), "echo");
        assert_eq!(cfg.models.registry["fast"].model_type, "chat");
        assert_eq!(cfg.models.registry["careful"].temperature, Some(0.2));
        assert_eq!(cfg.program_models["HeadlineGenerator"], "careful");
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.host, DEFAULT_HOST);
        assert_eq!(cfg.server.sync_worker_threads, Some(4));
        assert_eq!(cfg.tracing.max_depth, 12);
        assert!(!cfg.scheduler.enabled);
    }

    #[test]
    fn parse_minimal_config_uses_defaults() {
        let cfg: Config = serde_yaml::from_str("app_id: tiny\n").unwrap();
        assert_eq!(cfg.units_dir, PathBuf::from(DEFAULT_UNITS_DIR));
        assert_eq!(cfg.logs_dir, PathBuf::from(DEFAULT_LOGS_DIR));
        assert_eq!(cfg.server.port, DEFAULT_PORT);
        assert_eq!(cfg.tracing.max_depth, DEFAULT_TRACE_MAX_DEPTH);
        assert!(cfg.scheduler.enabled);
        assert!(cfg.models.registry.is_empty());
    }

    #[test]
    fn test_overrides() {
        let mut cfg: Config = serde_yaml::from_str(FULL).unwrap();
        let env: HashMap<&str, &str> =
            HashMap::from([(ENV_LOGS_DIR, "/var/log/switchboard"), (ENV_PORT, "8123")]);
        cfg.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(cfg.logs_dir, PathBuf::from("/var/log/switchboard"));
        assert_eq!(cfg.server.port, 8123);

        cfg.apply_overrides(|key| (key == ENV_PORT).then(|| "not-a-port".to_string()));
        assert_eq!(cfg.server.port, 8123);
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("switchboard.yaml");
        fs::write(&path, "app_id: tiny\nunits_dir: my_units\nlogs_dir: /abs/logs\n").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.units_dir, dir.path().join("my_units"));
        // SWITCHBOARD_LOGS_DIR may be set in the environment running the tests.
        if std::env::var(ENV_LOGS_DIR).is_err() {
            assert_eq!(cfg.logs_dir, PathBuf::from("/abs/logs"));
        }
    }

    #[test]
    fn test_load_and_validate_reports_all_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("switchboard.yaml");
        fs::write(
            &path,
            r#"
app_id: broken
models:
  default: missing
  registry:
    fast: { model: "" }
program_models:
  Echo: nope
server:
  sync_worker_threads: 0
"#,
        )
        .unwrap();

        let err = load_and_validate_config(&path).unwrap_err();
        let ConfigError::Invalid(errors) = &err else {
            panic!("expected validation failure, got {}", err);
        };
        assert!(errors.contains(&ValidationError::UnknownDefaultModel {
            alias: "missing".to_string()
        }));
        assert!(errors.contains(&ValidationError::UnknownProgramModel {
            unit: "Echo".to_string(),
            alias: "nope".to_string()
        }));
        assert!(errors.contains(&ValidationError::EmptyModelIdentifier {
            alias: "fast".to_string()
        }));
        assert!(errors.contains(&ValidationError::ZeroWorkerThreads));
        assert!(err.to_string().starts_with("Configuration validation failed:"));
    }

    #[test]
    fn test_load_missing_and_malformed() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_config(dir.path().join("nope.yaml")),
            Err(ConfigError::Read { .. })
        ));

        let path = dir.path().join("bad.yaml");
        fs::write(&path, "app_id: [unterminated").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Parse { .. })));
    }
}
