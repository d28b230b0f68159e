pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, AsrConfig, AudioConfig, GeneralConfig};
pub use error::{AsrError, ConfigError, DeviceError, EncodeError};
pub use types::{AudioBlock, RecordingBuffer, TranscribeOptions, Transcription, BLOCK_FRAMES};
