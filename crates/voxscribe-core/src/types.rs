/// Frames per capture block, matching the audio callback quantum.
pub const BLOCK_FRAMES: usize = 128;

/// One block of mono float samples in [-1.0, 1.0], emitted by the
/// capture thread. Immutable once sent; ownership moves to the session.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    pub samples: Vec<f32>,
}

/// A flattened recording: mono samples plus the rate the device
/// actually delivered them at.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl RecordingBuffer {
    pub fn frames(&self) -> usize {
        self.samples.len()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Request metadata forwarded to the ASR backend alongside the audio.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscribeOptions {
    /// ISO-ish language hint, or "auto" for backend-side detection.
    pub language: String,
    /// Free-text context to bias recognition.
    pub context: String,
    /// Inverse text normalization ("one hundred" → "100").
    pub enable_itn: bool,
}

impl Default for TranscribeOptions {
    fn default() -> Self {
        Self {
            language: "auto".to_string(),
            context: String::new(),
            enable_itn: false,
        }
    }
}

/// Final result of one transcription request. `language` is empty when
/// the backend did not report one.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    pub text: String,
    pub language: String,
}
