use crate::backend::AsrBackend;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use voxscribe_core::{AsrError, TranscribeOptions, Transcription};

const SIMPLE_API_ENDPOINT: &str = "https://c0rpr74ughd0-deploy.space.z.ai/api/asr-inference";

/// Protocol A: a plain JSON endpoint taking base64 audio and returning
/// `{success, data: [text, language_info]}`.
pub struct SimpleJsonBackend {
    client: reqwest::Client,
    endpoint: String,
    lang_re: Regex,
}

#[derive(Serialize)]
struct AudioFile {
    data: String,
    name: &'static str,
    #[serde(rename = "type")]
    mime: &'static str,
    size: usize,
}

#[derive(Serialize)]
struct SimpleRequest {
    audio_file: AudioFile,
    context: String,
    language: String,
    enable_itn: bool,
}

impl SimpleJsonBackend {
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.unwrap_or_else(|| SIMPLE_API_ENDPOINT.to_string()),
            // The backend reports the detection as a tagged phrase; the
            // capture after the marker is the language name.
            lang_re: Regex::new("检测到的语言：(.*)$").unwrap(),
        }
    }

    /// Most specific available error message: nested `error`, then
    /// `details`, then `message`, then the HTTP status text.
    fn extract_error(body: &Value, status: reqwest::StatusCode) -> String {
        for key in ["error", "details", "message"] {
            if let Some(v) = body.get(key) {
                if let Some(s) = v.as_str() {
                    if !s.is_empty() {
                        return s.to_string();
                    }
                }
                if let Some(s) = v.get("message").and_then(Value::as_str) {
                    if !s.is_empty() {
                        return s.to_string();
                    }
                }
            }
        }
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    }

    /// Best-effort normalization of the language string: strip the
    /// detection marker, then keep the segment before a "Name / English"
    /// style suffix. Not guaranteed to cover every backend locale.
    fn normalize_language(&self, lang_info: &str) -> String {
        let lang = self
            .lang_re
            .captures(lang_info)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or(lang_info);
        lang.split(" / ").next().unwrap_or(lang).trim().to_string()
    }
}

#[async_trait]
impl AsrBackend for SimpleJsonBackend {
    fn name(&self) -> &str {
        "simple"
    }

    async fn transcribe(
        &self,
        wav: &[u8],
        opts: &TranscribeOptions,
    ) -> Result<Transcription, AsrError> {
        let payload = SimpleRequest {
            audio_file: AudioFile {
                data: BASE64.encode(wav),
                name: "recording.wav",
                mime: "audio/wav",
                size: wav.len(),
            },
            context: opts.context.clone(),
            language: if opts.language.is_empty() {
                "auto".to_string()
            } else {
                opts.language.clone()
            },
            enable_itn: opts.enable_itn,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AsrError::Transport(e.to_string()))?;

        let status = resp.status();
        let text_body = resp
            .text()
            .await
            .map_err(|e| AsrError::Transport(e.to_string()))?;
        let body: Value = serde_json::from_str(&text_body).unwrap_or(Value::Null);

        if !status.is_success() {
            return Err(AsrError::Transport(format!(
                "HTTP {}: {}",
                status.as_u16(),
                Self::extract_error(&body, status)
            )));
        }
        if body.is_null() {
            return Err(AsrError::Transport("malformed JSON response".to_string()));
        }
        if body.get("success").and_then(Value::as_bool) != Some(true) {
            return Err(AsrError::Protocol(Self::extract_error(&body, status)));
        }

        let data = body
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| AsrError::Protocol("missing result list".to_string()))?;
        let text = data
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| AsrError::Protocol("no recognized text".to_string()))?
            .to_string();
        let lang_info = data.get(1).and_then(Value::as_str).unwrap_or("");

        Ok(Transcription {
            text,
            language: self.normalize_language(lang_info),
        })
    }
}
