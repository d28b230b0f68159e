use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),
}

/// Microphone acquisition failures. All are terminal for the current
/// attempt; the session never retries on its own.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("input device not found: {0}")]
    NotFound(String),

    #[error("microphone hardware unreadable: {0}")]
    Unreadable(String),

    #[error("audio host unavailable: {0}")]
    HostUnavailable(String),

    #[error("failed to enumerate devices: {0}")]
    Enumeration(String),

    #[error("failed to build input stream: {0}")]
    StreamBuild(String),
}

/// Resample/encode failures. Fatal for this attempt, non-retryable.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("resampling failed: {0}")]
    Resample(String),
}

#[derive(Debug, Error)]
pub enum AsrError {
    /// Non-2xx status, malformed body, or a broken stream.
    #[error("transport error: {0}")]
    Transport(String),

    /// 2xx response whose payload is missing expected fields.
    #[error("backend returned no usable result: {0}")]
    Protocol(String),

    #[error("ASR backend not found: {0}")]
    BackendNotFound(String),

    #[error("API key not configured for backend: {0}")]
    MissingApiKey(String),
}
