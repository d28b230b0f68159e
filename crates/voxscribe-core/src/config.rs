use crate::error::ConfigError;
use crate::types::TranscribeOptions;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub asr: AsrConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AudioConfig {
    #[serde(default = "default_device_name")]
    pub device_name: String,

    /// Requested capture rate. The device may pick its own; the pipeline
    /// resamples to `target_sample_rate` before upload either way.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_sample_rate")]
    pub target_sample_rate: u32,

    /// Recording ceiling; the session force-stops when it is reached.
    #[serde(default = "default_max_recording_secs")]
    pub max_recording_secs: u64,

    /// Playback-rate time scaling applied during resample. 1.0 = none.
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            sample_rate: default_sample_rate(),
            target_sample_rate: default_sample_rate(),
            max_recording_secs: default_max_recording_secs(),
            time_scale: default_time_scale(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AsrConfig {
    /// "simple" or "dashscope".
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Endpoint override, mainly for tests. Each backend has a default.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub context: String,

    #[serde(default)]
    pub enable_itn: bool,

    /// Server-sent-event streaming (dashscope only).
    #[serde(default)]
    pub streaming: bool,
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            endpoint: None,
            api_key: String::new(),
            model: default_model(),
            language: default_language(),
            context: String::new(),
            enable_itn: false,
            streaming: false,
        }
    }
}

impl AsrConfig {
    pub fn transcribe_options(&self) -> TranscribeOptions {
        TranscribeOptions {
            language: self.language.clone(),
            context: self.context.clone(),
            enable_itn: self.enable_itn,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_device_name() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_max_recording_secs() -> u64 {
    180
}

fn default_time_scale() -> f64 {
    1.0
}

fn default_backend() -> String {
    "simple".to_string()
}

fn default_model() -> String {
    "qwen3-asr-flash".to_string()
}

fn default_language() -> String {
    "auto".to_string()
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}").unwrap();
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                errors.push(var_name.to_string());
            }
        }
    }

    if let Some(first_missing) = errors.into_iter().next() {
        return Err(ConfigError::EnvVarNotFound(first_missing));
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let interpolated = interpolate_env_vars(&content)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (for testing).
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }
}
