//! Service configuration.
//!
//! Settings come from a YAML `config.yml`, found in the first of
//! [`CONFIG_FOLDERS`] that has one (or at `COMCUTTER_CONFIG`), layered with
//! `COMCUTTER__<SECTION>__<KEY>` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;

use comcutter_worker::config::{DEFAULT_SIZE_THRESHOLD, DEFAULT_TIMEOUT_SECS, DEFAULT_WORKERS};
use comcutter_worker::WorkerConfig;

pub const CONFIG_FILE: &str = "config.yml";
pub const CONFIG_FOLDERS: [&str; 3] = [".", "/data/config", "/config"];
pub const LOG_FILE_NAME: &str = "comcutter.log";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not find valid configuration file (searched: {})", display_paths(.0))]
    NotFound(Vec<PathBuf>),

    #[error("error parsing config file: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Whole configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub comskip: ComskipSettings,
    #[serde(default)]
    pub postprocess: PostProcessSettings,
}

/// `api:` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Shared secret expected in every request body
    pub apikey: Option<String>,
    pub host: String,
    pub port: u16,
    /// Root that submitted paths are resolved against
    pub library_dir: PathBuf,
    /// debug, info, warning or error
    pub log_level: String,
    /// Write `comcutter.log` here instead of the console
    pub log_dir: Option<PathBuf>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            apikey: None,
            host: "0.0.0.0".to_string(),
            port: 8080,
            library_dir: PathBuf::from("/library"),
            log_level: "debug".to_string(),
            log_dir: None,
        }
    }
}

impl ApiSettings {
    /// `EnvFilter` directive for the configured level. Unknown values mean debug.
    pub fn log_directive(&self) -> &'static str {
        match self.log_level.to_lowercase().as_str() {
            "info" => "info",
            "warning" | "warn" => "warn",
            "error" => "error",
            _ => "debug",
        }
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.log_dir
            .as_ref()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| dir.join(LOG_FILE_NAME))
    }
}

/// `comskip:` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ComskipSettings {
    /// Wrapper executable to invoke
    pub cmd: Option<PathBuf>,
    /// Detector binary passed as `--comskip=`
    pub comskip_cmd: Option<PathBuf>,
    pub comskip_ini: Option<PathBuf>,
    pub keep_edl: bool,
    /// Seconds; zero or negative means the default
    pub timeout: Option<i64>,
    pub size_percentage: f64,
    pub workers: usize,
}

impl Default for ComskipSettings {
    fn default() -> Self {
        Self {
            cmd: None,
            comskip_cmd: None,
            comskip_ini: None,
            keep_edl: false,
            timeout: None,
            size_percentage: DEFAULT_SIZE_THRESHOLD,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl ComskipSettings {
    pub fn timeout(&self) -> Duration {
        match self.timeout {
            Some(secs) if secs > 0 => Duration::from_secs(secs as u64),
            _ => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// `postprocess:` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostProcessSettings {
    pub cmd: Option<PathBuf>,
}

/// HTTP server settings derived from [`Settings`].
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub apikey: String,
    /// Max request body size
    pub max_body_size: usize,
}

impl ApiConfig {
    pub fn new(apikey: impl Into<String>) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            apikey: apikey.into(),
            max_body_size: 64 * 1024,
        }
    }
}

impl Settings {
    /// Locate and load the configuration file.
    pub fn load() -> ConfigResult<(Self, PathBuf)> {
        let explicit = std::env::var_os("COMCUTTER_CONFIG").map(PathBuf::from);
        let folders: Vec<PathBuf> = CONFIG_FOLDERS.iter().map(PathBuf::from).collect();

        let path = locate(explicit.as_deref(), &folders)?;
        let settings = Self::from_file(&path, env_source())?;
        Ok((settings, path))
    }

    /// Load `path` with `env` layered on top.
    pub fn from_file(path: &Path, env: Environment) -> ConfigResult<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(env)
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from YAML text, without the environment layer.
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check required keys and value ranges.
    pub fn validate(&self) -> ConfigResult<()> {
        if non_empty(self.api.apikey.as_deref()).is_none() {
            return Err(ConfigError::Invalid(
                "could not find api:apikey in config file".to_string(),
            ));
        }
        if non_empty_path(self.comskip.cmd.as_ref()).is_none() {
            return Err(ConfigError::Invalid("comskip:cmd is required".to_string()));
        }
        if non_empty_path(self.comskip.comskip_cmd.as_ref()).is_none() {
            return Err(ConfigError::Invalid("comskip:comskip_cmd is required".to_string()));
        }
        let ratio = self.comskip.size_percentage;
        if !ratio.is_finite() || ratio < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "comskip:size_percentage must be a non-negative number, got {ratio}"
            )));
        }
        if self.comskip.workers == 0 {
            return Err(ConfigError::Invalid("comskip:workers must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            host: self.api.host.clone(),
            port: self.api.port,
            apikey: self.api.apikey.clone().unwrap_or_default(),
            ..ApiConfig::new("")
        }
    }

    pub fn worker_config(&self) -> WorkerConfig {
        let comskip = &self.comskip;
        let defaults = WorkerConfig::default();

        WorkerConfig {
            workers: comskip.workers,
            cmd: non_empty_path(comskip.cmd.as_ref()).unwrap_or(defaults.cmd),
            comskip_cmd: non_empty_path(comskip.comskip_cmd.as_ref()).unwrap_or(defaults.comskip_cmd),
            comskip_ini: non_empty_path(comskip.comskip_ini.as_ref()),
            keep_edl: comskip.keep_edl,
            timeout: comskip.timeout(),
            size_threshold: comskip.size_percentage,
            postprocess_cmd: non_empty_path(self.postprocess.cmd.as_ref()),
        }
    }
}

/// The explicit path if given (it must exist), otherwise the first
/// `config.yml` found in `folders`.
fn locate(explicit: Option<&Path>, folders: &[PathBuf]) -> ConfigResult<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(ConfigError::NotFound(vec![path.to_path_buf()]));
    }

    let candidates: Vec<PathBuf> = folders.iter().map(|folder| folder.join(CONFIG_FILE)).collect();

    candidates
        .iter()
        .find(|p| p.is_file())
        .cloned()
        .ok_or(ConfigError::NotFound(candidates))
}

/// `COMCUTTER__SECTION__KEY` variables.
pub fn env_source() -> Environment {
    Environment::with_prefix("COMCUTTER")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn non_empty_path(value: Option<&PathBuf>) -> Option<PathBuf> {
    value.filter(|p| !p.as_os_str().is_empty()).cloned()
}
